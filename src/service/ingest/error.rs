use snafu::Snafu;

use crate::service::database::BackendError;
use crate::service::youtube::YouTubeError;

/// A failed ingestion cycle. Each variant names the step that failed; nothing was written unless the failure is
/// [IngestError::Persist], and even then the storage rolls the batch back.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum IngestError {
    #[snafu(display("could not read the newest stored video: {source}"))]
    Window { source: BackendError },

    #[snafu(display("search request failed: {source}"))]
    Search { source: YouTubeError },

    #[snafu(display("detail request failed: {source}"))]
    Details { source: YouTubeError },

    #[snafu(display("could not look up already stored videos: {source}"))]
    Lookup { source: BackendError },

    #[snafu(display("could not persist videos: {source}"))]
    Persist { source: BackendError },
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Window { .. } => "window",
            IngestError::Search { source } | IngestError::Details { source } => source.kind(),
            IngestError::Lookup { .. } => "lookup",
            IngestError::Persist { .. } => "persist",
        }
    }

    /// Status code of the upstream response, when the failure came from one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            IngestError::Search { source } | IngestError::Details { source } => source.status(),
            _ => None,
        }
    }
}
