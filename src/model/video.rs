use crate::service::youtube::{SearchItem, VideoDetail};

use super::*;

/// A video as it is persisted. Created once on first observation and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct VideoRecord {
    pub id: Thing,
    pub external_id: VideoId,

    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    #[serde(with = "surreal_datetime")]
    pub published_at: Timestamp,

    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,

    #[serde(with = "surreal_datetime")]
    pub ingested_at: Timestamp,
}

impl VideoRecord {
    /// Combine the snippet returned by a search with the statistics returned by a detail lookup.
    ///
    /// Supplementary fields the upstream omitted fall back to zero or empty values.
    pub fn from_upstream(item: &SearchItem, detail: &VideoDetail, ingested_at: Timestamp) -> Self {
        let snippet = &item.snippet;

        Self {
            id: item.video_id.thing(),
            external_id: item.video_id.clone(),
            title: snippet.title.clone(),
            description: snippet.description.clone(),
            channel_id: snippet.channel_id.clone(),
            channel_title: snippet.channel_title.clone(),
            published_at: snippet.published_at,
            duration: detail.duration().to_string(),
            view_count: detail.view_count(),
            like_count: detail.like_count(),
            tags: detail.tags().to_vec(),
            thumbnails: snippet.thumbnails.clone().filter(|x| !x.is_empty()),
            ingested_at,
        }
    }
}

/// The three thumbnail variants kept per video. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

impl Thumbnails {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.medium.is_none() && self.high.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Fields that storage can order records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PublishedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::PublishedAt => "published_at",
        }
    }
}
