use std::collections::HashSet;
use std::future::Future;

use derive_new::new;
use serde::Deserialize;
use snafu::ResultExt;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth;
use surrealdb::opt::IntoQuery;
use surrealdb::Surreal;
use tracing::instrument;

use crate::model::*;

pub use error::*;
pub use query::*;

mod error;
mod query;

const SCHEMA: &str = include_str!("../../../schema.surrealql");

/// The storage side of ingestion: a durable collection of [VideoRecord] keyed by [VideoId].
///
/// Implementations must enforce uniqueness of the external id atomically. Two writers racing to insert the same
/// video must end with one record, and the loser must be told so through [Inserted::duplicates] rather than an
/// error. The ingestion engine holds no lock of its own and relies on this for idempotence.
pub trait VideoStore: Send + Sync {
    /// The record with the greatest value of `field`, if any.
    fn find_max_by(&self, field: SortField) -> impl Future<Output = Result<Option<VideoRecord>>> + Send;

    /// The record with the smallest value of `field`, if any.
    fn find_min_by(&self, field: SortField) -> impl Future<Output = Result<Option<VideoRecord>>> + Send;

    /// The subset of `ids` that is already stored.
    fn existing_ids(&self, ids: &[VideoId]) -> impl Future<Output = Result<HashSet<VideoId>>> + Send;

    /// Insert `videos`, skipping the ones whose id already exists.
    fn insert_batch(&self, videos: Vec<VideoRecord>) -> impl Future<Output = Result<Inserted>> + Send;

    fn count_all(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// Outcome of [VideoStore::insert_batch].
#[derive(Debug, Clone, Default, PartialEq, Eq, new)]
pub struct Inserted {
    pub records: Vec<VideoRecord>,
    pub duplicates: usize,
}

/// A summary of what is currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub newest: Option<Timestamp>,
    pub oldest: Option<Timestamp>,
}

impl StoreStats {
    pub async fn collect(store: &impl VideoStore) -> Result<Self> {
        let total = store.count_all().await?;
        let newest = store.find_max_by(SortField::PublishedAt).await?;
        let oldest = store.find_min_by(SortField::PublishedAt).await?;

        Ok(Self {
            total,
            newest: newest.map(|x| x.published_at),
            oldest: oldest.map(|x| x.published_at),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: String,
    #[serde(rename = "surreal_ns", default = "default_name")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "default_name")]
    pub database: String,
    #[serde(rename = "surreal_user", default)]
    pub username: Option<String>,
    #[serde(rename = "surreal_pass", default)]
    pub password: Option<String>,
}

fn default_name() -> String {
    "feedwatch".to_string()
}

impl DatabaseConfig {
    /// An in-process database that lives as long as the connection.
    pub fn memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: default_name(),
            database: default_name(),
            username: None,
            password: None,
        }
    }

    fn credentials(&self) -> Option<auth::Root<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(auth::Root { username, password }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backend {
    database: Surreal<Any>,
}

impl Backend {
    #[instrument(skip(config), fields(url = %config.url, ns = %config.namespace, db = %config.database))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connection_error = || DatabaseConnectionSnafu {
            url: config.url.clone(),
            namespace: config.namespace.clone(),
            database: config.database.clone(),
        };

        let database = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .with_context(|_| connection_error())?;

        if let Some(credentials) = config.credentials() {
            database
                .signin(credentials)
                .await
                .with_context(|_| connection_error())?;
        }

        database
            .use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .with_context(|_| connection_error())?;

        database
            .query(SCHEMA)
            .await
            .and_then(|x| x.check())
            .context(DatabaseSchemaSnafu)?;

        tracing::info!("connected to the database");

        Ok(Self { database })
    }

    pub async fn memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::memory()).await
    }

    /// Create a builder to execute arbitrary SurrealQL on the database.
    pub fn sql(&self, query: impl IntoQuery) -> Bindings<'_> {
        Bindings::new(self.database.query(query))
    }

    async fn find_one_by(&self, field: SortField, direction: &str) -> Result<Option<VideoRecord>> {
        let query = format!(
            "SELECT * FROM {VIDEOS} ORDER BY {} {direction} LIMIT 1",
            field.column()
        );

        self.sql(query).fetch_first().await
    }
}

#[derive(Debug, Deserialize)]
struct Count {
    total: u64,
}

impl VideoStore for Backend {
    async fn find_max_by(&self, field: SortField) -> Result<Option<VideoRecord>> {
        self.find_one_by(field, "DESC").await
    }

    async fn find_min_by(&self, field: SortField) -> Result<Option<VideoRecord>> {
        self.find_one_by(field, "ASC").await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn existing_ids(&self, ids: &[VideoId]) -> Result<HashSet<VideoId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let existing: Vec<VideoId> = self
            .sql(format!(
                "SELECT VALUE external_id FROM {VIDEOS} WHERE external_id INSIDE $ids"
            ))
            .bind(("ids", ids.to_vec()))
            .fetch_first()
            .await?;

        Ok(existing.into_iter().collect())
    }

    /// Create the records one at a time. `CREATE` rejects a taken id where `INSERT` would hand back the stored row,
    /// so each duplicate is counted and never reported as written.
    #[instrument(skip(self, videos), fields(count = videos.len()))]
    async fn insert_batch(&self, videos: Vec<VideoRecord>) -> Result<Inserted> {
        let mut inserted = Inserted::default();

        for video in videos {
            let created: Result<Option<VideoRecord>, surrealdb::Error> = self
                .database
                .create((VIDEOS, video.external_id.as_ref()))
                .content(&video)
                .await;

            match created {
                Ok(Some(record)) => inserted.records.push(record),
                Ok(None) => inserted.records.push(video),
                Err(error) if is_duplicate(&error) => {
                    tracing::debug!(video_id = %video.external_id, "video was already stored");
                    inserted.duplicates += 1;
                }
                Err(source) => return Err(BackendError::DatabaseInsert { count: 1, source }),
            }
        }

        Ok(inserted)
    }

    async fn count_all(&self) -> Result<u64> {
        let count: Option<Count> = self
            .sql(format!("SELECT count() AS total FROM {VIDEOS} GROUP ALL"))
            .fetch_first()
            .await?;

        Ok(count.map(|x| x.total).unwrap_or_default())
    }
}
