//! Import run row model.

use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `import_runs` table.
///
/// One row per import run, append-only apart from the progress and
/// status columns mutated by the orchestrator while the run is live.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ImportRun {
    pub id: DbId,
    pub strategy: String,
    pub status: String,
    pub progress_percent: i32,
    pub processed_records: i64,
    pub total_records: Option<i64>,
    pub total_fetched: i64,
    pub valid_records: i64,
    pub invalid_records: i64,
    pub current_operation: Option<String>,
    pub last_error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}
