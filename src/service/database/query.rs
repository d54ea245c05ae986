use serde::de::DeserializeOwned;
use snafu::ResultExt;
use surrealdb::engine::any::Any;
use surrealdb::opt::QueryResult;

use super::*;

/// A query waiting for its parameters. Parameters can be bound using the [Bindings::bind] method which takes any serializable data structure.
///
/// # Example
/// ```ignore
/// let ids: Vec<VideoId> = backend.sql("SELECT VALUE external_id FROM videos WHERE channel_id = $channel")
///     .bind(("channel", "UC123"))
///     .fetch_first()
///     .await?;
/// ```
#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response], surfacing the first failed statement as an error.
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self.query.await.context(DatabaseQuerySnafu)?;
        let response = response.check().context(DatabaseQuerySnafu)?;
        Ok(response)
    }

    /// Execute the query and return the first statement's result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}
