use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::service::database::VideoStore;
use crate::service::ingest::Ingestor;
use crate::service::youtube::Upstream;

/// Work that the [Scheduler] runs on every tick.
pub trait Job: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = ()> + Send;
}

impl<U, S> Job for Ingestor<U, S>
where
    U: Upstream + 'static,
    S: VideoStore + 'static,
{
    async fn run(&self) {
        self.execute().await;
    }
}

/// Runs a [Job] periodically, never more than one at a time.
///
/// A tick that arrives while the previous run is still going is dropped, not queued.
#[derive(Debug)]
pub struct Scheduler<J> {
    job: Arc<J>,
    period: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Proof that a run is in progress. Clears the flag when dropped, so a failing or panicking job never leaves the
/// scheduler stuck.
#[derive(Debug)]
pub struct InFlight {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<J: Job> Scheduler<J> {
    pub fn new(job: J, period: Duration) -> Self {
        Self {
            job: Arc::new(job),
            period,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight flag, or `None` if a run already holds it.
    pub fn try_begin(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                flag: self.in_flight.clone(),
            })
    }

    /// Start a run in the background unless one is already in flight.
    pub fn tick(&self) -> Option<JoinHandle<()>> {
        let Some(guard) = self.try_begin() else {
            tracing::info!("previous run is still in progress, skipping this tick");
            return None;
        };

        let job = self.job.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            job.run().await;
        });

        Some(handle)
    }

    /// Tick every period, starting immediately, until `shutdown` completes. A run that is in progress at shutdown
    /// is awaited before returning.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(period = %humantime::format_duration(self.period), "scheduler started");

        tokio::pin!(shutdown);
        let mut last: Option<JoinHandle<()>> = None;

        loop {
            select! {
                _ = &mut shutdown => {
                    tracing::info!("shutting down the scheduler");
                    break;
                }

                _ = timer.tick() => {
                    if let Some(handle) = self.tick() {
                        last = Some(handle);
                    }
                }
            }
        }

        if let Some(handle) = last {
            if !handle.is_finished() {
                tracing::info!("waiting for the run in progress to finish");
            }

            if let Err(error) = handle.await {
                tracing::error!(%error, "last run did not complete");
            }
        }
    }
}
