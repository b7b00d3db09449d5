//! The shared phase executor.
//!
//! Every entity phase runs the same batch loop: rate-limit gate, fetch
//! with retry, structural validation, idempotent upsert, metrics and
//! progress advance, checkpoint write. Dispatch over the entity type
//! happens inside the store's `upsert_batch`, so a phase is fully
//! described by its [`EntityType`].
//!
//! Ordering guarantee: the checkpoint for batch N is written after
//! batch N's records are persisted and before page N+1 is fetched.
//! Cancellation is only polled between batches, so a cancelled phase
//! always leaves a checkpoint describing a fully committed batch.

use tokio_util::sync::CancellationToken;

use clubsync_core::backoff::BackoffConfig;
use clubsync_core::entity::EntityType;
use clubsync_core::import::{progress_percent, Checkpoint};
use clubsync_core::record::ScrapedRecord;
use clubsync_core::types::DbId;
use clubsync_core::validation::{validate_record, ValidationMetrics};
use clubsync_scraper::client::PageFetcher;
use clubsync_scraper::retry::fetch_page_with_retry;
use clubsync_scraper::ScrapeError;

use crate::error::SyncError;
use crate::ratelimit::RateLimiter;
use crate::store::{ImportStore, RunProgress};

/// Consecutive skipped pages before the phase is treated as a full
/// upstream outage rather than isolated bad pages.
const MAX_CONSECUTIVE_SKIPS: u32 = 3;

/// Terminal state of one phase.
#[derive(Debug, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Source exhausted; `skipped` lists pages deferred for explicit retry.
    Done { pages: u32, skipped: Vec<u32> },
    /// The cancellation signal fired at a batch boundary.
    Cancelled,
}

/// Runs phases for one import, carrying metrics and progress across them.
pub struct PhaseRunner<'a> {
    pub store: &'a dyn ImportStore,
    pub fetcher: &'a dyn PageFetcher,
    pub limiter: &'a RateLimiter,
    pub backoff: &'a BackoffConfig,
    pub cancel: &'a CancellationToken,
    pub run_id: DbId,
    pub total_records: Option<i64>,
    pub metrics: ValidationMetrics,
    pub processed: i64,
    /// Progress percent reported when `total_records` is unknown;
    /// carried forward from the last checkpoint.
    pub carried_progress: i32,
}

impl PhaseRunner<'_> {
    /// Execute one phase from `start_page` until the source is exhausted.
    pub async fn run_phase(
        &mut self,
        entity: EntityType,
        start_page: u32,
    ) -> Result<PhaseStatus, SyncError> {
        let mut page = start_page;
        let mut skipped: Vec<u32> = Vec::new();
        let mut consecutive_skips = 0u32;

        loop {
            // Batch boundary: the only cancellation point.
            if self.cancel.is_cancelled() {
                return Ok(PhaseStatus::Cancelled);
            }
            if !self.limiter.acquire_slot(self.cancel).await {
                return Ok(PhaseStatus::Cancelled);
            }

            match fetch_page_with_retry(self.fetcher, entity, page, self.backoff, self.cancel)
                .await
            {
                Ok(records) => {
                    if records.is_empty() {
                        break; // Source exhausted.
                    }
                    consecutive_skips = 0;
                    self.commit_batch(entity, page, records).await?;
                    page += 1;
                }
                // Past the last page; pagination indexes can be sparse.
                Err(ScrapeError::NotFound) => break,
                Err(ScrapeError::Cancelled) => return Ok(PhaseStatus::Cancelled),
                // The site is down entirely. Fail the run (checkpoint
                // stays at the last committed batch) instead of
                // skipping every remaining page.
                Err(e @ ScrapeError::Unavailable(_)) => return Err(SyncError::Scrape(e)),
                Err(e) => {
                    // Retries exhausted or the page is malformed: defer
                    // this page and move on.
                    tracing::warn!(
                        run_id = self.run_id,
                        entity = %entity,
                        page,
                        error = %e,
                        "Page failed all retries, recording as skipped",
                    );
                    self.store
                        .record_skipped_page(entity, page, &e.to_string())
                        .await?;
                    skipped.push(page);
                    consecutive_skips += 1;
                    if consecutive_skips >= MAX_CONSECUTIVE_SKIPS {
                        return Err(SyncError::Scrape(e));
                    }
                    page += 1;
                }
            }
        }

        Ok(PhaseStatus::Done {
            pages: page.saturating_sub(start_page),
            skipped,
        })
    }

    /// Validate, persist, and checkpoint one fetched page.
    ///
    /// Invalid records are dropped and counted; they never abort the
    /// batch. The checkpoint write is last, after the upsert commits.
    async fn commit_batch(
        &mut self,
        entity: EntityType,
        page: u32,
        records: Vec<ScrapedRecord>,
    ) -> Result<(), SyncError> {
        let fetched = records.len();
        let mut valid = Vec::with_capacity(fetched);
        let mut invalid = 0u64;

        for record in records {
            let errors = validate_record(&record);
            if errors.is_empty() && record.entity_type() == entity {
                valid.push(record);
            } else {
                invalid += 1;
                tracing::debug!(
                    run_id = self.run_id,
                    entity = %entity,
                    ext_id = record.ext_id(),
                    errors = ?errors,
                    "Dropping record that failed validation",
                );
            }
        }

        self.store.upsert_batch(entity, &valid).await?;

        self.metrics.record_valid(valid.len() as u64);
        self.metrics.record_invalid(invalid);
        self.processed += fetched as i64;

        let progress = match self.total_records {
            Some(total) => progress_percent(self.processed, total),
            None => self.carried_progress,
        };
        self.carried_progress = progress;

        self.store
            .update_run_progress(
                self.run_id,
                &RunProgress {
                    processed_records: self.processed,
                    progress_percent: progress,
                    total_records: self.total_records,
                    current_operation: format!("Importing {entity} (page {page})"),
                    metrics: self.metrics,
                },
            )
            .await?;

        let last_processed_id = valid.iter().map(|r| r.ext_id()).max();
        self.store
            .write_checkpoint(&Checkpoint {
                phase: entity,
                batch_index: page,
                last_processed_id,
                progress_percent: progress,
            })
            .await?;

        tracing::debug!(
            run_id = self.run_id,
            entity = %entity,
            page,
            valid = valid.len(),
            invalid,
            "Batch committed and checkpointed",
        );

        Ok(())
    }
}
