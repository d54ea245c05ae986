use dotenvy::dotenv;
use snafu::ResultExt;

use feedwatch::config::Config;
use feedwatch::error::*;
use feedwatch::logger;
use feedwatch::service::database::Backend;
use feedwatch::service::ingest::Ingestor;
use feedwatch::service::scheduler::Scheduler;
use feedwatch::service::youtube::{CredentialPool, HttpTransport, YouTube};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env().context(ConfigSnafu)?;

    let _guard = logger::init(&config)?;

    let backend = Backend::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let credentials = CredentialPool::new(config.youtube.api_keys.iter().cloned()).context(ConfigSnafu)?;
    let transport =
        HttpTransport::new(config.youtube.api_url.clone(), config.request_timeout).context(YouTubeSnafu)?;
    let youtube = YouTube::new(transport, credentials);

    let ingestor = Ingestor::new(youtube, backend, config.ingest());
    ingestor.log_stats().await;

    let scheduler = Scheduler::new(ingestor, config.fetch_interval);

    scheduler
        .run(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "could not listen for the shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
