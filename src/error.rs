use snafu::{Location, Snafu};

use crate::config::ConfigError;
use crate::service::database::BackendError;
use crate::service::youtube::YouTubeError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not load the configuration
    Config {
        source: ConfigError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing_subscriber::util::TryInitError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not connect to the database
    ConnectDatabase {
        source: BackendError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not set up the YouTube client
    YouTube {
        source: YouTubeError,
        #[snafu(implicit)]
        location: Location,
    },
}
