//! Repository for the `import_runs` table.

use sqlx::PgPool;

use clubsync_core::types::DbId;

use crate::models::import_run::ImportRun;

/// Column list for import_runs queries.
const COLUMNS: &str = "id, strategy, status, progress_percent, processed_records, \
    total_records, total_fetched, valid_records, invalid_records, \
    current_operation, last_error, started_at, finished_at";

/// Provides CRUD operations for import runs.
pub struct ImportRunRepo;

impl ImportRunRepo {
    /// Create a new run in `pending` status, returning the created row.
    pub async fn create(
        pool: &PgPool,
        strategy: &str,
        total_records: Option<i64>,
    ) -> Result<ImportRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_runs (strategy, total_records)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(strategy)
            .bind(total_records)
            .fetch_one(pool)
            .await
    }

    /// Find a run by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_runs WHERE id = $1");
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The most recently started run, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_runs ORDER BY started_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Update the status of a run; terminal statuses also set `finished_at`.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
        last_error: Option<&str>,
    ) -> Result<Option<ImportRun>, sqlx::Error> {
        let query = format!(
            "UPDATE import_runs SET
                status = $2,
                last_error = COALESCE($3, last_error),
                finished_at = CASE
                    WHEN $2 IN ('completed', 'failed', 'cancelled') THEN now()
                    ELSE finished_at
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(id)
            .bind(status)
            .bind(last_error)
            .fetch_optional(pool)
            .await
    }

    /// Update the progress and validation counters of a run.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        processed_records: i64,
        progress_percent: i32,
        total_records: Option<i64>,
        current_operation: &str,
        total_fetched: i64,
        valid_records: i64,
        invalid_records: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE import_runs SET
                processed_records = $2,
                progress_percent = $3,
                total_records = COALESCE($4, total_records),
                current_operation = $5,
                total_fetched = $6,
                valid_records = $7,
                invalid_records = $8
             WHERE id = $1",
        )
        .bind(id)
        .bind(processed_records)
        .bind(progress_percent)
        .bind(total_records)
        .bind(current_operation)
        .bind(total_fetched)
        .bind(valid_records)
        .bind(invalid_records)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List runs, newest first.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImportRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_runs
             ORDER BY started_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, ImportRun>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
