//! Repository for the singleton `import_checkpoint` row.
//!
//! There is exactly one live checkpoint at a time, identified by a
//! fixed key. Callers must only write a checkpoint after the batch it
//! describes has been committed; that ordering is what makes
//! crash-and-resume replay at most one batch.

use sqlx::PgPool;

use crate::models::checkpoint::CheckpointRow;

/// Fixed key of the singleton checkpoint row.
pub const CHECKPOINT_KEY: &str = "import";

/// Column list for import_checkpoint queries.
const COLUMNS: &str = "key, phase, batch_index, last_processed_id, progress_percent, updated_at";

/// Provides read/overwrite/clear for the import checkpoint.
pub struct CheckpointRepo;

impl CheckpointRepo {
    /// Read the current checkpoint, if one exists.
    pub async fn read(pool: &PgPool) -> Result<Option<CheckpointRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_checkpoint WHERE key = $1");
        sqlx::query_as::<_, CheckpointRow>(&query)
            .bind(CHECKPOINT_KEY)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the singleton checkpoint.
    pub async fn write(
        pool: &PgPool,
        phase: &str,
        batch_index: i32,
        last_processed_id: Option<i64>,
        progress_percent: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO import_checkpoint
                (key, phase, batch_index, last_processed_id, progress_percent)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (key) DO UPDATE SET
                phase = EXCLUDED.phase,
                batch_index = EXCLUDED.batch_index,
                last_processed_id = EXCLUDED.last_processed_id,
                progress_percent = EXCLUDED.progress_percent,
                updated_at = now()",
        )
        .bind(CHECKPOINT_KEY)
        .bind(phase)
        .bind(batch_index)
        .bind(last_processed_id)
        .bind(progress_percent)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove the checkpoint (called on successful full completion).
    pub async fn clear(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM import_checkpoint WHERE key = $1")
            .bind(CHECKPOINT_KEY)
            .execute(pool)
            .await?;
        Ok(())
    }
}
