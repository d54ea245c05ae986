use snafu::Snafu;

pub type Result<T, E = BackendError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum BackendError {
    #[snafu(display(
        "Failed to connect to the database `{url}` [{namespace}/{database}]: {source}"
    ))]
    DatabaseConnection {
        url: String,
        namespace: String,
        database: String,
        source: surrealdb::Error,
    },
    #[snafu(display("Failed to apply the database schema: {source}"))]
    DatabaseSchema { source: surrealdb::Error },
    #[snafu(display("Failed to query the database: {source}"))]
    DatabaseQuery { source: surrealdb::Error },
    #[snafu(display("Failed to deserialize the database response: {source}"))]
    DatabaseDeserialize { source: surrealdb::Error },
    #[snafu(display("Failed to insert {count} record(s): {source}"))]
    DatabaseInsert {
        count: usize,
        source: surrealdb::Error,
    },
}

/// Whether `error` is the storage rejecting a record because its key already exists.
///
/// The embedded engine reports a typed error. Remote engines only forward the server's message, which reads
/// "Database record `...` already exists" or "Database index `...` already contains ...".
pub fn is_duplicate(error: &surrealdb::Error) -> bool {
    use surrealdb::error::{Api, Db};

    match error {
        surrealdb::Error::Db(Db::RecordExists { .. } | Db::IndexExists { .. }) => true,
        surrealdb::Error::Api(Api::Query(message)) => {
            message.contains("already exists") || message.contains("already contains")
        }
        _ => false,
    }
}
