use serde_with::{serde_as, DisplayFromStr};

use crate::model::{Thumbnails, Timestamp, VideoId};

use super::*;

/// A list response of the upstream API. Both `search` and `videos` wrap their results in `items`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// A lightweight search result: the id plus whatever metadata the snippet carries.
#[derive(Debug, Clone, PartialEq, Eq, New)]
pub struct SearchItem {
    pub video_id: VideoId,
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawSearchItem {
    id: SearchResultId,
    snippet: Snippet,
}

impl RawSearchItem {
    /// Search can return channels and playlists too. Those carry no video id and are dropped.
    pub(super) fn into_item(self) -> Option<SearchItem> {
        let video_id = self.id.video_id?;
        Some(SearchItem {
            video_id: video_id.into(),
            snippet: self.snippet,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, New)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub published_at: Timestamp,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

/// Full metadata of a single video as returned by the `videos` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, New)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: VideoId,
    #[serde(default)]
    pub snippet: Option<DetailSnippet>,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl VideoDetail {
    /// ISO 8601 duration, e.g. `PT4M13S`. Empty when the upstream omitted it.
    pub fn duration(&self) -> &str {
        self.content_details
            .as_ref()
            .and_then(|x| x.duration.as_deref())
            .unwrap_or_default()
    }

    pub fn view_count(&self) -> u64 {
        self.statistics
            .as_ref()
            .and_then(|x| x.view_count)
            .unwrap_or_default()
    }

    pub fn like_count(&self) -> u64 {
        self.statistics
            .as_ref()
            .and_then(|x| x.like_count)
            .unwrap_or_default()
    }

    pub fn tags(&self) -> &[String] {
        self.snippet
            .as_ref()
            .map(|x| x.tags.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DetailSnippet {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
}

// counters are sent as decimal strings
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub view_count: Option<u64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub like_count: Option<u64>,
}

/// The error envelope of the upstream API.
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

const QUOTA_EXCEEDED: &str = "quotaExceeded";

impl ErrorBody {
    /// Parse an error body. Bodies that are not the expected envelope are kept as the message.
    pub(super) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| ErrorBody {
            error: Some(ErrorDetail {
                message: body.to_string(),
                errors: Vec::new(),
            }),
        })
    }

    pub(super) fn reason(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|x| x.errors.first())
            .map(|x| x.reason.as_str())
    }

    pub(super) fn message(&self) -> &str {
        self.error.as_ref().map(|x| x.message.as_str()).unwrap_or_default()
    }

    /// The upstream answers 403 for several unrelated problems, only the reason tells a quota error apart.
    pub(super) fn is_quota_exceeded(&self, status: u16) -> bool {
        status == 403 && self.reason() == Some(QUOTA_EXCEEDED)
    }
}
