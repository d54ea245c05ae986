use snafu::Snafu;

pub type Result<T, E = YouTubeError> = ::std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum YouTubeError {
    #[snafu(display("could not build the http client: {source}"))]
    Client { source: reqwest::Error },

    #[snafu(display("request to `{endpoint}` failed: {source}"))]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },

    #[snafu(display("request to `{endpoint}` timed out"))]
    Timeout { endpoint: String },

    #[snafu(display("API returned {status} for `{endpoint}`: {message}"))]
    Api {
        endpoint: String,
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[snafu(display("malformed response from `{endpoint}`: {source}"))]
    InvalidBody {
        endpoint: String,
        source: serde_json::Error,
    },

    #[snafu(display("all API keys have exceeded their quota after {attempts} attempt(s)"))]
    QuotaExhausted { attempts: usize },
}

impl YouTubeError {
    /// The HTTP status the upstream answered with, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            YouTubeError::Api { status, .. } => Some(*status),
            YouTubeError::Request { source, .. } => source.status().map(|x| x.as_u16()),
            _ => None,
        }
    }

    /// A short, stable name for the kind of failure. Used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            YouTubeError::Client { .. } => "client",
            YouTubeError::Request { .. } => "request",
            YouTubeError::Timeout { .. } => "timeout",
            YouTubeError::Api { .. } => "api",
            YouTubeError::InvalidBody { .. } => "invalid_body",
            YouTubeError::QuotaExhausted { .. } => "quota_exhausted",
        }
    }
}
