//! Fakes for the upstream API and the storage, shared by the unit tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use tokio::net::TcpListener;
use url::Url;

use crate::model::{SortField, Thumbnail, Thumbnails, Timestamp, VideoId, VideoRecord};
use crate::service::database::{self, BackendError, Inserted, VideoStore};
use crate::service::youtube::{
    self, ContentDetails, DetailSnippet, RawResponse, SearchItem, Snippet, Statistics, Transport,
    Upstream, VideoDetail, YouTubeError,
};

/// Initialize tracing for tests, writing into the captured test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub const QUOTA_BODY: &str = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota.","errors":[{"reason":"quotaExceeded","domain":"youtube.quota"}]}}"#;

pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn search_item(id: &str, published_minute: i64) -> SearchItem {
    let snippet = Snippet {
        published_at: base_time() + Duration::minutes(published_minute),
        channel_id: "UC1".to_string(),
        channel_title: "Channel".to_string(),
        title: format!("video {id}"),
        description: format!("description of {id}"),
        thumbnails: Some(Thumbnails {
            default: Some(Thumbnail::new(format!("https://i.ytimg.com/vi/{id}/default.jpg"), Some(120), Some(90))),
            medium: None,
            high: None,
        }),
    };

    SearchItem::new(id.into(), snippet)
}

pub fn detail(id: &str) -> VideoDetail {
    VideoDetail::new(
        id.into(),
        Some(DetailSnippet {
            tags: vec!["tag".to_string()],
        }),
        Some(ContentDetails {
            duration: Some("PT2M".to_string()),
        }),
        Some(Statistics {
            view_count: Some(100),
            like_count: Some(7),
        }),
    )
}

pub fn record(id: &str, published_minute: i64) -> VideoRecord {
    VideoRecord::from_upstream(&search_item(id, published_minute), &detail(id), base_time())
}

/// An HTTP server that accepts connections and never answers. Returns its base url and the number of
/// connections accepted so far.
pub async fn silent_server() -> (Url, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            open.push(socket);
        }
    });

    let base = Url::parse(&format!("http://{address}/youtube/v3")).unwrap();
    (base, accepted)
}

/// A transport that replays canned responses in order and remembers every request it received.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<(String, Vec<(&'static str, String)>)>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = (u16, &'static str)>) -> Self {
        let responses = responses
            .into_iter()
            .map(|(status, body)| RawResponse::new(status, body.to_string()))
            .collect();

        Self {
            responses: Mutex::new(responses),
            requests: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The API key each request was sent with, in order.
    pub fn keys(&self) -> Vec<String> {
        let requests = self.requests.lock().unwrap();
        requests
            .iter()
            .filter_map(|(_, params)| lookup(params, "key"))
            .collect()
    }

    pub fn param(&self, index: usize, name: &str) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        let (_, params) = requests.get(index)?;
        lookup(params, name)
    }
}

fn lookup(params: &[(&'static str, String)], name: &str) -> Option<String> {
    params.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone())
}

impl Transport for ScriptedTransport {
    async fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> youtube::Result<RawResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.to_vec()));

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left");

        Ok(response)
    }
}

/// An upstream that always answers with the same search results and knows the details of a fixed set of videos.
#[derive(Default)]
pub struct FakeUpstream {
    pub items: Vec<SearchItem>,
    pub details: Vec<VideoDetail>,
    /// When set, `search` fails with an API error carrying this status.
    pub fail_status: Option<u16>,
    pub searches: Mutex<Vec<(String, Timestamp, u32)>>,
    pub detail_requests: Mutex<Vec<Vec<VideoId>>>,
}

impl FakeUpstream {
    pub fn new(items: Vec<SearchItem>, details: Vec<VideoDetail>) -> Self {
        Self {
            items,
            details,
            ..Default::default()
        }
    }

    pub fn last_published_after(&self) -> Option<Timestamp> {
        self.searches.lock().unwrap().last().map(|(_, after, _)| *after)
    }

    pub fn detail_requests(&self) -> Vec<Vec<VideoId>> {
        self.detail_requests.lock().unwrap().clone()
    }
}

impl Upstream for FakeUpstream {
    async fn search(
        &self, query: &str, published_after: Timestamp, max_results: u32,
    ) -> youtube::Result<Vec<SearchItem>> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), published_after, max_results));

        if let Some(status) = self.fail_status {
            return Err(YouTubeError::Api {
                endpoint: "search".to_string(),
                status,
                reason: Some("backendError".to_string()),
                message: "scripted failure".to_string(),
            });
        }

        Ok(self.items.clone())
    }

    async fn details(&self, ids: &[VideoId]) -> youtube::Result<Vec<VideoDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.detail_requests.lock().unwrap().push(ids.to_vec());

        let details = self
            .details
            .iter()
            .filter(|x| ids.contains(&x.id))
            .cloned()
            .collect();

        Ok(details)
    }
}

/// A store backed by a map. Uniqueness is enforced under a single lock, the way a database would do it atomically.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<VideoId, VideoRecord>>,
    /// Pretend nothing exists when asked, as if another writer got in between the check and the insert.
    pub hide_existing: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub insert_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn with(records: impl IntoIterator<Item = VideoRecord>) -> Self {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.external_id.clone(), record);
            }
        }
        store
    }

    pub fn ids(&self) -> Vec<VideoId> {
        self.records.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn insert_calls(&self) -> usize {
        *self.insert_calls.lock().unwrap()
    }
}

impl VideoStore for MemoryStore {
    async fn find_max_by(&self, _field: SortField) -> database::Result<Option<VideoRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.values().max_by_key(|x| x.published_at).cloned())
    }

    async fn find_min_by(&self, _field: SortField) -> database::Result<Option<VideoRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.values().min_by_key(|x| x.published_at).cloned())
    }

    async fn existing_ids(&self, ids: &[VideoId]) -> database::Result<HashSet<VideoId>> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(HashSet::new());
        }

        let records = self.records.lock().unwrap();
        Ok(ids.iter().filter(|x| records.contains_key(*x)).cloned().collect())
    }

    async fn insert_batch(&self, videos: Vec<VideoRecord>) -> database::Result<Inserted> {
        *self.insert_calls.lock().unwrap() += 1;

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(BackendError::DatabaseQuery {
                source: surrealdb::error::Db::Thrown("disk full".to_string()).into(),
            });
        }

        let mut records = self.records.lock().unwrap();
        let mut inserted = Inserted::default();

        for video in videos {
            if records.contains_key(&video.external_id) {
                inserted.duplicates += 1;
                continue;
            }

            records.insert(video.external_id.clone(), video.clone());
            inserted.records.push(video);
        }

        Ok(inserted)
    }

    async fn count_all(&self) -> database::Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}
