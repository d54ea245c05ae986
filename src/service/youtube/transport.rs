use std::future::Future;
use std::time::Duration;

use snafu::ResultExt;
use url::Url;

use super::*;

/// The raw answer of the upstream API: the status code and the undecoded body.
///
/// Decoding is left to the client so that quota errors are recognised by the shape of the body
/// rather than the status code alone.
#[derive(Debug, Clone, PartialEq, Eq, New)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can perform a GET against an endpoint of the upstream API.
pub trait Transport: Send + Sync {
    fn get(
        &self, endpoint: &str, params: &[(&'static str, String)],
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// [Transport] over HTTP. Every request is bounded by the timeout given at construction.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(ClientSnafu)?;

        Ok(Self { client, base })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> Result<RawResponse> {
        let failed = |source: reqwest::Error| {
            if source.is_timeout() {
                YouTubeError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                YouTubeError::Request {
                    endpoint: endpoint.to_string(),
                    source,
                }
            }
        };

        let response = self
            .client
            .get(self.url(endpoint))
            .query(params)
            .send()
            .await
            .map_err(failed)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(failed)?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_support::silent_server;

    #[test]
    fn joins_base_and_endpoint() {
        let base = Url::parse("https://www.googleapis.com/youtube/v3/").unwrap();
        let transport = HttpTransport::new(base, Duration::from_secs(1)).unwrap();

        assert_eq!(
            transport.url("/search"),
            "https://www.googleapis.com/youtube/v3/search"
        );
    }

    #[test]
    fn only_2xx_is_success() {
        assert!(RawResponse::new(200, String::new()).is_success());
        assert!(!RawResponse::new(403, String::new()).is_success());
        assert!(!RawResponse::new(500, String::new()).is_success());
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let (base, accepted) = silent_server().await;
        let transport = HttpTransport::new(base, Duration::from_millis(100)).unwrap();

        let error = transport.get("search", &[("q", "official".to_string())]).await.unwrap_err();

        assert!(matches!(&error, YouTubeError::Timeout { endpoint } if endpoint == "search"));
        assert_eq!(error.kind(), "timeout");
        assert_eq!(error.status(), None);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
