//! Top-level import orchestration.
//!
//! [`ImportOrchestrator`] is the state machine that owns a run's
//! lifecycle: it acquires the advisory lock, creates the run record,
//! resumes from the persisted checkpoint, executes phases sequentially
//! in dependency order, and finalizes status on every exit path. The
//! triggering caller gets the run id back immediately; execution
//! continues on a detached task and progress is observed by polling the
//! run record.
//!
//! The orchestrator is explicitly constructed and dependency-injected;
//! cancellation tokens are scoped to this instance, keyed by run id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use clubsync_core::backoff::BackoffConfig;
use clubsync_core::entity::{EntityType, ImportStrategy};
use clubsync_core::import::ImportStatus;
use clubsync_core::types::DbId;
use clubsync_core::validation::{validate_record, ValidationMetrics};
use clubsync_scraper::client::PageFetcher;
use clubsync_scraper::retry::fetch_page_with_retry;

use crate::alert::{AlertSender, SyncFailureAlert};
use crate::error::SyncError;
use crate::integrity::{self, IntegrityStatus};
use crate::phase::{PhaseRunner, PhaseStatus};
use crate::progress::{self, SyncStatus};
use crate::ratelimit::{RateLimiter, SCRAPE_BUCKET};
use crate::store::ImportStore;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for the import engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backoff policy for upstream page fetches.
    pub backoff: BackoffConfig,
    /// Rate limit window for upstream requests.
    pub rate_limit_window_ms: u64,
    /// Maximum upstream requests per window.
    pub rate_limit_max_requests: u32,
    /// Wall-clock budget for a full run; exceeding it self-cancels the
    /// run with a timeout-classified error.
    pub max_run_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            rate_limit_window_ms: 60_000,
            rate_limit_max_requests: 30,
            max_run_secs: 7_200,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How the phase pipeline ended (errors are carried separately).
enum PipelineEnd {
    Completed,
    Cancelled,
}

/// Result of an explicit skipped-page retry.
#[derive(Debug, Default, Serialize)]
pub struct SkippedRetryOutcome {
    /// Pages fetched and merged successfully.
    pub retried: Vec<u32>,
    /// Records written during the retry.
    pub merged_records: u64,
    /// Pages that failed again and stay on the skipped list.
    pub still_failing: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Coordinates import runs. One instance per process, owned by the host.
pub struct ImportOrchestrator {
    store: Arc<dyn ImportStore>,
    fetcher: Arc<dyn PageFetcher>,
    alerts: Arc<dyn AlertSender>,
    config: SyncConfig,
    /// Cancellation signals for live runs, keyed by run id.
    cancel_tokens: Mutex<HashMap<DbId, CancellationToken>>,
}

impl ImportOrchestrator {
    pub fn new(
        store: Arc<dyn ImportStore>,
        fetcher: Arc<dyn PageFetcher>,
        alerts: Arc<dyn AlertSender>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            alerts,
            config,
            cancel_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Start an import in the background, returning its run id.
    ///
    /// Fails with [`SyncError::LockHeld`] when another import holds the
    /// advisory lock; nothing is created or modified in that case.
    pub async fn start_import(
        self: &Arc<Self>,
        strategy: ImportStrategy,
        estimated_total: Option<i64>,
    ) -> Result<DbId, SyncError> {
        let holder = format!("import-{}", uuid::Uuid::new_v4());
        if !self.store.acquire_lock(&holder).await? {
            return Err(SyncError::LockHeld);
        }

        let run_id = match self.store.create_run(&strategy, estimated_total).await {
            Ok(id) => id,
            Err(e) => {
                // Nothing started; give the lock back before surfacing.
                if let Err(release_err) = self.store.release_lock().await {
                    tracing::error!(error = %release_err, "Failed to release lock after create_run error");
                }
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .lock()
            .expect("cancel token map poisoned")
            .insert(run_id, cancel.clone());

        tracing::info!(run_id, strategy = %strategy, "Import started");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.execute(run_id, strategy, cancel).await;
        });

        Ok(run_id)
    }

    /// Request cooperative cancellation of a live run.
    ///
    /// The run exits before its next batch; the checkpoint for the last
    /// committed batch is preserved, so cancellation is resumable.
    pub fn cancel(&self, run_id: DbId) -> Result<(), SyncError> {
        let tokens = self.cancel_tokens.lock().expect("cancel token map poisoned");
        match tokens.get(&run_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(run_id, "Cancellation requested");
                Ok(())
            }
            None => Err(SyncError::RunNotFound(run_id)),
        }
    }

    /// Read-side projection of the current import state for polling.
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        progress::current_status(self.store.as_ref()).await
    }

    /// Re-fetch only the listed previously-skipped pages and merge the
    /// results into existing data. The checkpoint is not touched.
    pub async fn retry_skipped_pages(
        &self,
        entity: EntityType,
        pages: &[u32],
    ) -> Result<SkippedRetryOutcome, SyncError> {
        // Same single-writer rule as a full import.
        let holder = format!("retry-{}", uuid::Uuid::new_v4());
        if !self.store.acquire_lock(&holder).await? {
            return Err(SyncError::LockHeld);
        }

        let result = self.retry_pages_inner(entity, pages).await;

        if let Err(e) = self.store.release_lock().await {
            tracing::error!(error = %e, "Failed to release lock after skipped-page retry");
        }
        result
    }

    /// Cancel all live runs and wait for none to remain. Called on
    /// process shutdown.
    pub fn shutdown(&self) {
        let tokens = self.cancel_tokens.lock().expect("cancel token map poisoned");
        for (run_id, token) in tokens.iter() {
            tracing::info!(run_id, "Cancelling run for shutdown");
            token.cancel();
        }
    }

    // -- internals ----------------------------------------------------------

    async fn retry_pages_inner(
        &self,
        entity: EntityType,
        pages: &[u32],
    ) -> Result<SkippedRetryOutcome, SyncError> {
        let cancel = CancellationToken::new();
        let mut outcome = SkippedRetryOutcome::default();

        for page in pages {
            match fetch_page_with_retry(
                self.fetcher.as_ref(),
                entity,
                *page,
                &self.config.backoff,
                &cancel,
            )
            .await
            {
                Ok(records) => {
                    let valid: Vec<_> = records
                        .into_iter()
                        .filter(|r| r.entity_type() == entity && validate_record(r).is_empty())
                        .collect();
                    let written = self.store.upsert_batch(entity, &valid).await?;
                    self.store.clear_skipped_page(entity, *page).await?;
                    outcome.retried.push(*page);
                    outcome.merged_records += written;
                    tracing::info!(entity = %entity, page, written, "Skipped page merged");
                }
                Err(e) => {
                    tracing::warn!(entity = %entity, page, error = %e, "Skipped page failed again");
                    outcome.still_failing.push(*page);
                }
            }
        }

        Ok(outcome)
    }

    /// Drive one run to a terminal state, releasing resources on every
    /// exit path.
    async fn execute(self: Arc<Self>, run_id: DbId, strategy: ImportStrategy, cancel: CancellationToken) {
        let budget = Duration::from_secs(self.config.max_run_secs);
        let outcome =
            tokio::time::timeout(budget, self.run_pipeline(run_id, &strategy, &cancel)).await;

        let finalize = match outcome {
            Ok(Ok(PipelineEnd::Completed)) => self.finish_completed(run_id).await,
            Ok(Ok(PipelineEnd::Cancelled)) => self.finish_cancelled(run_id).await,
            Ok(Err(e)) => self.finish_failed(run_id, &e).await,
            Err(_) => {
                // The pipeline future was dropped at the deadline; the
                // checkpoint still describes the last committed batch.
                cancel.cancel();
                let e = SyncError::Timeout(self.config.max_run_secs);
                self.finish_failed(run_id, &e).await
            }
        };

        if let Err(e) = finalize {
            tracing::error!(run_id, error = %e, "Failed to finalize import run");
        }

        // Release the lock and drop the cancellation handle regardless
        // of how finalization went.
        if let Err(e) = self.store.release_lock().await {
            tracing::error!(run_id, error = %e, "Failed to release advisory lock");
        }
        self.cancel_tokens
            .lock()
            .expect("cancel token map poisoned")
            .remove(&run_id);
    }

    /// Run the phase pipeline, resuming from the persisted checkpoint.
    async fn run_pipeline(
        &self,
        run_id: DbId,
        strategy: &ImportStrategy,
        cancel: &CancellationToken,
    ) -> Result<PipelineEnd, SyncError> {
        self.store
            .set_run_status(run_id, ImportStatus::Running, None)
            .await?;

        let run = self
            .store
            .get_run(run_id)
            .await?
            .ok_or(SyncError::RunNotFound(run_id))?;

        let phases = strategy.phases();
        let checkpoint = self.store.read_checkpoint().await?;

        // Phases before the checkpointed one were already committed by a
        // previous attempt; the checkpointed phase resumes at the page
        // after its last committed batch.
        let (resume_idx, resume_page, carried_progress) = match &checkpoint {
            Some(cp) => match phases.iter().position(|e| *e == cp.phase) {
                Some(idx) => {
                    tracing::info!(
                        run_id,
                        phase = %cp.phase,
                        resume_page = cp.resume_page(),
                        "Resuming from checkpoint",
                    );
                    (idx, cp.resume_page(), cp.progress_percent)
                }
                // Checkpoint belongs to a different strategy; start over.
                None => (0, 1, 0),
            },
            None => (0, 1, 0),
        };

        let limiter = RateLimiter::new(
            Arc::clone(&self.store),
            SCRAPE_BUCKET,
            self.config.rate_limit_window_ms,
            self.config.rate_limit_max_requests,
        );

        let mut runner = PhaseRunner {
            store: self.store.as_ref(),
            fetcher: self.fetcher.as_ref(),
            limiter: &limiter,
            backoff: &self.config.backoff,
            cancel,
            run_id,
            total_records: run.total_records,
            metrics: ValidationMetrics::default(),
            processed: 0,
            carried_progress,
        };

        for (idx, entity) in phases.iter().enumerate() {
            if idx < resume_idx {
                continue;
            }
            let start_page = if idx == resume_idx { resume_page } else { 1 };

            tracing::info!(run_id, phase = %entity, start_page, "Starting import phase");

            match runner.run_phase(*entity, start_page).await? {
                PhaseStatus::Cancelled => return Ok(PipelineEnd::Cancelled),
                PhaseStatus::Done { pages, skipped } => {
                    if skipped.is_empty() {
                        tracing::info!(run_id, phase = %entity, pages, "Phase complete");
                    } else {
                        tracing::warn!(
                            run_id,
                            phase = %entity,
                            pages,
                            skipped = ?skipped,
                            "Phase complete with skipped pages",
                        );
                    }
                }
            }
        }

        // Post-run referential sweep: warnings only, never fatal.
        match integrity::run_checks(self.store.as_ref()).await {
            Ok(summary) if summary.status == IntegrityStatus::Fail => {
                tracing::warn!(run_id, issues = ?summary.issues, "Integrity sweep found orphans");
            }
            Ok(summary) => {
                tracing::info!(run_id, checks = summary.total_checks, "Integrity sweep passed");
            }
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Integrity sweep failed to run");
            }
        }

        Ok(PipelineEnd::Completed)
    }

    async fn finish_completed(&self, run_id: DbId) -> Result<(), SyncError> {
        // Force progress to 100 before flipping the status.
        if let Some(run) = self.store.get_run(run_id).await? {
            self.store
                .update_run_progress(
                    run_id,
                    &crate::store::RunProgress {
                        processed_records: run.processed_records,
                        progress_percent: 100,
                        total_records: run.total_records,
                        current_operation: "Import completed".to_string(),
                        metrics: run.metrics,
                    },
                )
                .await?;
        }
        self.store
            .set_run_status(run_id, ImportStatus::Completed, None)
            .await?;
        self.store.clear_checkpoint().await?;
        tracing::info!(run_id, "Import completed");
        Ok(())
    }

    async fn finish_cancelled(&self, run_id: DbId) -> Result<(), SyncError> {
        // The checkpoint stays: cancellation is identical to a crash
        // from the resumption point of view.
        self.store
            .set_run_status(run_id, ImportStatus::Cancelled, None)
            .await?;
        tracing::info!(run_id, "Import cancelled");
        Ok(())
    }

    async fn finish_failed(&self, run_id: DbId, error: &SyncError) -> Result<(), SyncError> {
        // The checkpoint stays so a subsequent start resumes.
        self.store
            .set_run_status(run_id, ImportStatus::Failed, Some(&error.to_string()))
            .await?;
        tracing::error!(run_id, error = %error, "Import failed");

        // Best-effort alert; a delivery failure must not mask the
        // original error.
        let snapshot = self.store.get_run(run_id).await.ok().flatten();
        let alert = SyncFailureAlert {
            import_id: run_id,
            started_at: snapshot.as_ref().map(|r| r.started_at),
            error: error.to_string(),
            records_processed: snapshot.map(|r| r.processed_records).unwrap_or(0),
        };
        if let Err(alert_err) = self.alerts.send_sync_failure(&alert).await {
            tracing::warn!(run_id, error = %alert_err, "Failed to deliver failure alert");
        }

        Ok(())
    }
}
