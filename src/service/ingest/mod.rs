use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use derive_new::new;
use snafu::ResultExt;
use tracing::instrument;

use crate::model::{now, SortField, Timestamp, VideoId, VideoRecord};
use crate::service::database::{StoreStats, VideoStore};
use crate::service::youtube::{SearchItem, Upstream};

pub use error::*;

mod error;

/// What to ask the upstream for and how far back to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub query: String,
    pub max_results: u32,
    /// Subtracted from the newest stored publish time so that late-indexed videos are still found.
    pub overlap_margin: Duration,
    /// How far back to look when nothing is stored yet.
    pub cold_start: Duration,
}

impl IngestConfig {
    /// Lower bound of the search window.
    pub fn published_after(&self, latest: Option<Timestamp>, now: Timestamp) -> Timestamp {
        match latest {
            Some(latest) => back_from(latest, self.overlap_margin),
            None => back_from(now, self.cold_start),
        }
    }
}

fn back_from(timestamp: Timestamp, offset: Duration) -> Timestamp {
    chrono::Duration::from_std(offset)
        .ok()
        .and_then(|x| timestamp.checked_sub_signed(x))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// What a successful cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub published_after: Option<Timestamp>,
    /// Distinct ids returned by the search.
    pub candidates: usize,
    pub already_stored: usize,
    /// New ids the detail lookup returned nothing for. They are retried on the next cycle.
    pub missing_details: usize,
    pub inserted: usize,
    /// Records another writer stored between the lookup and the insert.
    pub raced: usize,
}

/// Pulls recent videos from an [Upstream] and stores the ones the [VideoStore] does not have yet.
///
/// A cycle never updates a stored record and never writes the same video twice, however often it runs.
#[derive(Debug, new)]
pub struct Ingestor<U, S> {
    upstream: U,
    store: S,
    config: IngestConfig,
}

impl<U: Upstream, S: VideoStore> Ingestor<U, S> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run one cycle and propagate the first failure. Nothing after the failed step runs.
    pub async fn run_cycle(&self) -> Result<CycleReport, IngestError> {
        let mut report = CycleReport::default();

        let latest = self
            .store
            .find_max_by(SortField::PublishedAt)
            .await
            .context(WindowSnafu)?
            .map(|x| x.published_at);
        let published_after = self.config.published_after(latest, now());
        report.published_after = Some(published_after);

        tracing::debug!(?latest, %published_after, "searching for new videos");

        let items = self
            .upstream
            .search(&self.config.query, published_after, self.config.max_results)
            .await
            .context(SearchSnafu)?;

        let candidates = distinct(items);
        report.candidates = candidates.len();

        if candidates.is_empty() {
            tracing::debug!("search returned nothing");
            return Ok(report);
        }

        let ids: Vec<VideoId> = candidates.iter().map(|x| x.video_id.clone()).collect();
        let existing = self.store.existing_ids(&ids).await.context(LookupSnafu)?;
        report.already_stored = existing.len();

        let fresh: Vec<SearchItem> = candidates
            .into_iter()
            .filter(|x| !existing.contains(&x.video_id))
            .collect();

        if fresh.is_empty() {
            tracing::debug!(candidates = report.candidates, "every candidate is already stored");
            return Ok(report);
        }

        let fresh_ids: Vec<VideoId> = fresh.iter().map(|x| x.video_id.clone()).collect();
        let details = self.upstream.details(&fresh_ids).await.context(DetailsSnafu)?;
        let details: HashMap<VideoId, _> = details.into_iter().map(|x| (x.id.clone(), x)).collect();

        let ingested_at = now();
        let mut records = Vec::with_capacity(fresh.len());

        for item in &fresh {
            match details.get(&item.video_id) {
                Some(detail) => records.push(VideoRecord::from_upstream(item, detail, ingested_at)),
                None => {
                    tracing::warn!(video_id = %item.video_id, "no details returned for video, skipping it");
                    report.missing_details += 1;
                }
            }
        }

        if records.is_empty() {
            return Ok(report);
        }

        let inserted = self.store.insert_batch(records).await.context(PersistSnafu)?;
        report.inserted = inserted.records.len();
        report.raced = inserted.duplicates;

        if inserted.duplicates > 0 {
            tracing::info!(duplicates = inserted.duplicates, "some videos were stored concurrently");
        }

        Ok(report)
    }

    /// Run one cycle and log its outcome. Failures end up in the log only, the next cycle starts over.
    #[instrument(skip(self), fields(query = %self.config.query))]
    pub async fn execute(&self) -> Option<CycleReport> {
        let started = Instant::now();
        let result = self.run_cycle().await;
        let elapsed = humantime::format_duration(Duration::from_millis(started.elapsed().as_millis() as u64));

        match result {
            Ok(report) => {
                tracing::info!(
                    candidates = report.candidates,
                    already_stored = report.already_stored,
                    missing_details = report.missing_details,
                    inserted = report.inserted,
                    raced = report.raced,
                    %elapsed,
                    "ingestion cycle finished"
                );

                if report.inserted > 0 {
                    self.log_stats().await;
                }

                Some(report)
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    kind = error.kind(),
                    status = ?error.upstream_status(),
                    %elapsed,
                    "ingestion cycle failed"
                );
                None
            }
        }
    }

    /// Log a summary of what the store holds. A failure to collect it is only worth a warning.
    pub async fn log_stats(&self) {
        match StoreStats::collect(&self.store).await {
            Ok(stats) => tracing::info!(
                total = stats.total,
                newest = ?stats.newest,
                oldest = ?stats.oldest,
                "stored videos"
            ),
            Err(error) => tracing::warn!(%error, "could not collect storage stats"),
        }
    }
}

/// Drop repeated ids, keeping the first occurrence and the upstream order.
fn distinct(items: Vec<SearchItem>) -> Vec<SearchItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|x| seen.insert(x.video_id.clone()))
        .collect()
}
