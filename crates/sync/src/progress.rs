//! Read-side projection of import state for polling clients.
//!
//! Unsynchronized with the writer: pollers always see the most recent
//! committed progress.

use serde::Serialize;

use clubsync_core::import::ImportStatus;
use clubsync_core::types::{DbId, Timestamp};

use crate::error::SyncError;
use crate::store::ImportStore;

/// Validation counters as exposed to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub total_records_processed: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    pub validation_rate: f64,
}

/// Current import state for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub is_running: bool,
    pub import_id: Option<DbId>,
    pub strategy: Option<String>,
    pub status: Option<ImportStatus>,
    /// Percent complete; absent while the total is still unknown
    /// (clients show `processed / unknown` instead).
    pub progress: Option<i32>,
    pub processed_records: i64,
    pub total_records: Option<i64>,
    pub current_operation: Option<String>,
    pub last_error: Option<String>,
    pub started_at: Option<Timestamp>,
    pub validation: ValidationSummary,
}

/// Project the latest run into a status response.
pub async fn current_status(store: &dyn ImportStore) -> Result<SyncStatus, SyncError> {
    let run = store.latest_run().await?;

    let Some(run) = run else {
        return Ok(SyncStatus {
            is_running: false,
            import_id: None,
            strategy: None,
            status: None,
            progress: None,
            processed_records: 0,
            total_records: None,
            current_operation: None,
            last_error: None,
            started_at: None,
            validation: ValidationSummary {
                total_records_processed: 0,
                valid_records: 0,
                invalid_records: 0,
                validation_rate: 0.0,
            },
        });
    };

    let progress = if run.total_records.is_some() || run.status.is_terminal() {
        Some(run.progress_percent)
    } else {
        None
    };

    Ok(SyncStatus {
        is_running: matches!(run.status, ImportStatus::Pending | ImportStatus::Running),
        import_id: Some(run.id),
        strategy: Some(run.strategy),
        status: Some(run.status),
        progress,
        processed_records: run.processed_records,
        total_records: run.total_records,
        current_operation: run.current_operation,
        last_error: run.last_error,
        started_at: Some(run.started_at),
        validation: ValidationSummary {
            total_records_processed: run.metrics.total_fetched,
            valid_records: run.metrics.valid_records,
            invalid_records: run.metrics.invalid_records,
            validation_rate: run.metrics.validation_rate(),
        },
    })
}
