//! Persistence seam for the import engine.
//!
//! The engine never touches the database directly; everything goes
//! through [`ImportStore`]. The production implementation
//! ([`PgImportStore`]) delegates to the repository layer; tests supply
//! an in-memory implementation.
//!
//! [`PgImportStore`]: crate::pg::PgImportStore

use async_trait::async_trait;
use serde::Serialize;

use clubsync_core::entity::{EntityType, ImportStrategy};
use clubsync_core::import::{Checkpoint, ImportStatus};
use clubsync_core::record::ScrapedRecord;
use clubsync_core::types::{DbId, Timestamp};
use clubsync_core::validation::ValidationMetrics;
use clubsync_core::verification::OverallVerificationReport;

use crate::error::SyncError;
use crate::integrity::IntegrityCheck;

/// Progress fields written on every batch tick.
#[derive(Debug, Clone)]
pub struct RunProgress {
    pub processed_records: i64,
    pub progress_percent: i32,
    pub total_records: Option<i64>,
    pub current_operation: String,
    pub metrics: ValidationMetrics,
}

/// Read-side projection of an import run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: DbId,
    pub strategy: String,
    pub status: ImportStatus,
    pub progress_percent: i32,
    pub processed_records: i64,
    pub total_records: Option<i64>,
    pub metrics: ValidationMetrics,
    pub current_operation: Option<String>,
    pub last_error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// A persisted verification report with its storage metadata.
#[derive(Debug, Clone, Serialize)]
pub struct StoredVerificationReport {
    pub id: DbId,
    pub created_at: Timestamp,
    pub report: OverallVerificationReport,
}

/// Everything the import engine needs from the relational store.
#[async_trait]
pub trait ImportStore: Send + Sync {
    // -- advisory lock ------------------------------------------------------

    /// Try to acquire the system-wide import lock. `false` means another
    /// holder has it (normal contention, not an error).
    async fn acquire_lock(&self, holder: &str) -> Result<bool, SyncError>;

    /// Release the import lock. Idempotent.
    async fn release_lock(&self) -> Result<(), SyncError>;

    // -- checkpoint ---------------------------------------------------------

    async fn read_checkpoint(&self) -> Result<Option<Checkpoint>, SyncError>;

    /// Overwrite the singleton checkpoint. Must only be called after the
    /// batch it describes has been committed.
    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SyncError>;

    async fn clear_checkpoint(&self) -> Result<(), SyncError>;

    // -- import runs --------------------------------------------------------

    async fn create_run(
        &self,
        strategy: &ImportStrategy,
        total_records: Option<i64>,
    ) -> Result<DbId, SyncError>;

    async fn set_run_status(
        &self,
        run_id: DbId,
        status: ImportStatus,
        last_error: Option<&str>,
    ) -> Result<(), SyncError>;

    async fn update_run_progress(
        &self,
        run_id: DbId,
        progress: &RunProgress,
    ) -> Result<(), SyncError>;

    async fn get_run(&self, run_id: DbId) -> Result<Option<RunSnapshot>, SyncError>;

    async fn latest_run(&self) -> Result<Option<RunSnapshot>, SyncError>;

    async fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<RunSnapshot>, SyncError>;

    // -- entity persistence -------------------------------------------------

    /// Idempotently upsert a batch of records by upstream natural id.
    /// Returns the number of records written.
    async fn upsert_batch(
        &self,
        entity: EntityType,
        records: &[ScrapedRecord],
    ) -> Result<u64, SyncError>;

    async fn entity_count(&self, entity: EntityType) -> Result<i64, SyncError>;

    /// Draw an unbiased random sample of upstream ids.
    async fn sample_ext_ids(&self, entity: EntityType, n: i64) -> Result<Vec<i64>, SyncError>;

    /// Read a persisted row back in its scraped-record shape.
    async fn stored_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, SyncError>;

    /// Orphan counts for the fixed referential-integrity battery.
    async fn orphan_counts(&self) -> Result<Vec<(IntegrityCheck, i64)>, SyncError>;

    // -- skipped pages ------------------------------------------------------

    async fn record_skipped_page(
        &self,
        entity: EntityType,
        page: u32,
        reason: &str,
    ) -> Result<(), SyncError>;

    async fn skipped_pages(&self, entity: EntityType) -> Result<Vec<u32>, SyncError>;

    async fn clear_skipped_page(&self, entity: EntityType, page: u32) -> Result<(), SyncError>;

    // -- rate limiting ------------------------------------------------------

    /// Count a request into the bucket's fixed window, returning the
    /// post-increment `(count, window_start)`.
    async fn increment_rate_bucket(
        &self,
        bucket: &str,
        window_ms: u64,
    ) -> Result<(u32, Timestamp), SyncError>;

    // -- verification reports -----------------------------------------------

    async fn save_verification_report(
        &self,
        report: &OverallVerificationReport,
    ) -> Result<DbId, SyncError>;

    async fn latest_verification_report(
        &self,
    ) -> Result<Option<StoredVerificationReport>, SyncError>;

    async fn verification_history(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredVerificationReport>, SyncError>;
}
