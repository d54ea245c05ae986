use super::*;

/// The identifier the upstream platform assigns to a video. This is the natural key of a [VideoRecord].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// The record id this video is stored under. Deriving it from the external id lets the primary key enforce uniqueness.
    pub fn thing(&self) -> Thing {
        (VIDEOS.to_string(), self.0.clone()).into()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::convert::AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
