use std::future::Future;

use derive_new::new as New;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use snafu::ResultExt;
use tracing::instrument;

use crate::model::{to_query_param, Timestamp, VideoId};

pub use credentials::*;
pub use error::*;
pub use response::*;
pub use transport::*;

mod credentials;
mod error;
mod response;
mod transport;

/// The most ids the `videos` endpoint accepts in one request, and the largest page `search` returns.
pub const MAX_PAGE_SIZE: u32 = 50;

/// The two read operations the ingestion engine needs from the video platform.
pub trait Upstream: Send + Sync {
    /// Videos matching `query` published after `published_after`, most recent first.
    fn search(
        &self, query: &str, published_after: Timestamp, max_results: u32,
    ) -> impl Future<Output = Result<Vec<SearchItem>>> + Send;

    /// Full metadata for each of `ids`. Ids the platform does not know are simply absent from the result.
    fn details(&self, ids: &[VideoId]) -> impl Future<Output = Result<Vec<VideoDetail>>> + Send;
}

/// Client for the YouTube Data API that rotates through a [CredentialPool] whenever a key runs out of quota.
#[derive(Debug)]
pub struct YouTube<T = HttpTransport> {
    transport: T,
    credentials: CredentialPool,
}

impl<T: Transport> YouTube<T> {
    pub fn new(transport: T, credentials: CredentialPool) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    /// Send a request with the active key. On a quota error rotate to the next key and try again,
    /// at most once per key in the pool. Any other failure is returned immediately.
    async fn request<R: DeserializeOwned>(
        &self, endpoint: &'static str, params: Vec<(&'static str, String)>,
    ) -> Result<R> {
        let attempts = self.credentials.len();

        for attempt in 1..=attempts {
            let key_index = self.credentials.index();

            let mut query = params.clone();
            query.push(("key", self.credentials.current().to_string()));

            let response = self.transport.get(endpoint, &query).await?;

            if response.is_success() {
                return serde_json::from_str(&response.body).context(InvalidBodySnafu { endpoint });
            }

            let error = ErrorBody::parse(&response.body);

            if !error.is_quota_exceeded(response.status) {
                tracing::error!(
                    endpoint,
                    status = response.status,
                    reason = error.reason(),
                    "API error: {}",
                    error.message()
                );

                return ApiSnafu {
                    endpoint,
                    status: response.status,
                    reason: error.reason().map(str::to_string),
                    message: error.message(),
                }
                .fail();
            }

            tracing::warn!(endpoint, attempt, key_index, "quota exceeded on API key");

            if attempt < attempts {
                self.credentials.rotate();
            }
        }

        QuotaExhaustedSnafu { attempts }.fail()
    }
}

impl<T: Transport> Upstream for YouTube<T> {
    #[instrument(skip(self))]
    async fn search(
        &self, query: &str, published_after: Timestamp, max_results: u32,
    ) -> Result<Vec<SearchItem>> {
        let params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            ("q", query.to_string()),
            ("maxResults", max_results.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("publishedAfter", to_query_param(published_after)),
        ];

        let page: Page<RawSearchItem> = self.request("search", params).await?;
        let items = page
            .items
            .into_iter()
            .filter_map(RawSearchItem::into_item)
            .collect();

        Ok(items)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn details(&self, ids: &[VideoId]) -> Result<Vec<VideoDetail>> {
        let mut details = Vec::with_capacity(ids.len());

        for batch in ids.chunks(MAX_PAGE_SIZE as usize) {
            let joined = batch.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(",");
            let params = vec![
                ("part", "snippet,contentDetails,statistics".to_string()),
                ("id", joined),
            ];

            let page: Page<VideoDetail> = self.request("videos", params).await?;
            details.extend(page.items);
        }

        Ok(details)
    }
}
