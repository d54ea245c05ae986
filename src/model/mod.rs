use derive_new::new;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

pub use timestamp::*;
pub use video::*;
pub use video_id::*;

mod timestamp;
mod video;
mod video_id;

/// Name of the table holding every ingested video.
pub const VIDEOS: &str = "videos";
