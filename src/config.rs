use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, DurationSeconds};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::service::database::DatabaseConfig;
use crate::service::ingest::IngestConfig;
use crate::service::youtube::MAX_PAGE_SIZE;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("could not load the configuration from the environment: {source}"))]
    Load { source: envy::Error },

    #[snafu(display("no API keys configured, set YOUTUBE_API_KEYS to a comma separated list"))]
    EmptyCredentials,
}

/// Everything the service reads from the environment. Loaded once at startup.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_search_query")]
    pub search_query: String,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "fetch_interval_seconds", default = "default_fetch_interval")]
    pub fetch_interval: Duration,

    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "overlap_margin_seconds", default = "default_overlap_margin")]
    pub overlap_margin: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "cold_start_seconds", default = "default_cold_start")]
    pub cold_start: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "request_timeout_seconds", default = "default_request_timeout")]
    pub request_timeout: Duration,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(flatten)]
    pub youtube: YouTubeConfig,

    #[serde(flatten)]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        envy::from_env::<Config>().context(LoadSnafu)
    }

    pub fn from_iter<I>(vars: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).context(LoadSnafu)
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            query: self.search_query.clone(),
            max_results: self.max_results.clamp(1, MAX_PAGE_SIZE),
            overlap_margin: self.overlap_margin,
            cold_start: self.cold_start,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeConfig {
    #[serde(rename = "youtube_api_keys", default, deserialize_with = "comma_separated")]
    pub api_keys: Vec<String>,

    #[serde(rename = "youtube_api_url", default = "default_api_url")]
    pub api_url: Url,
}

fn comma_separated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let text = String::deserialize(deserializer)?;
    let keys = text
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect();

    Ok(keys)
}

fn default_search_query() -> String {
    "official".to_string()
}

fn default_fetch_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_results() -> u32 {
    MAX_PAGE_SIZE
}

fn default_overlap_margin() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_cold_start() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_api_url() -> Url {
    Url::parse("https://www.googleapis.com/youtube/v3").expect("default API url is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = Config::from_iter(vars(&[
            ("SURREAL_URL", "mem://"),
            ("YOUTUBE_API_KEYS", "k1"),
        ]))
        .unwrap();

        assert_eq!(config.search_query, "official");
        assert_eq!(config.fetch_interval, Duration::from_secs(10));
        assert_eq!(config.max_results, 50);
        assert_eq!(config.overlap_margin, Duration::from_secs(120));
        assert_eq!(config.cold_start, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.youtube.api_url.as_str(), "https://www.googleapis.com/youtube/v3");
        assert_eq!(config.database.namespace, "feedwatch");
        assert_eq!(config.database.username, None);
    }

    #[test]
    fn overrides() {
        let config = Config::from_iter(vars(&[
            ("SURREAL_URL", "ws://localhost:8000"),
            ("SURREAL_USER", "root"),
            ("SURREAL_PASS", "root"),
            ("SEARCH_QUERY", "trailer"),
            ("FETCH_INTERVAL_SECONDS", "30"),
            ("MAX_RESULTS", "200"),
            ("OVERLAP_MARGIN_SECONDS", "60"),
            ("YOUTUBE_API_KEYS", "k1"),
        ]))
        .unwrap();

        assert_eq!(config.search_query, "trailer");
        assert_eq!(config.fetch_interval, Duration::from_secs(30));
        assert_eq!(config.database.username.as_deref(), Some("root"));

        let ingest = config.ingest();
        assert_eq!(ingest.max_results, 50, "page size is clamped to the upstream ceiling");
        assert_eq!(ingest.overlap_margin, Duration::from_secs(60));
        assert_eq!(ingest.query, "trailer");
    }

    #[test]
    fn api_keys_are_split_and_trimmed() {
        let config = Config::from_iter(vars(&[
            ("SURREAL_URL", "mem://"),
            ("YOUTUBE_API_KEYS", " k1, k2 ,,k3 "),
        ]))
        .unwrap();

        assert_eq!(config.youtube.api_keys, ["k1", "k2", "k3"]);
    }

    #[test]
    fn missing_api_keys_leave_an_empty_list() {
        let config = Config::from_iter(vars(&[("SURREAL_URL", "mem://")])).unwrap();
        assert!(config.youtube.api_keys.is_empty());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result = Config::from_iter(vars(&[("YOUTUBE_API_KEYS", "k1")]));
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }
}
