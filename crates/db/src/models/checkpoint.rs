//! Import checkpoint row model.

use clubsync_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// The singleton row from the `import_checkpoint` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CheckpointRow {
    pub key: String,
    pub phase: String,
    pub batch_index: i32,
    pub last_processed_id: Option<i64>,
    pub progress_percent: i32,
    pub updated_at: Timestamp,
}
