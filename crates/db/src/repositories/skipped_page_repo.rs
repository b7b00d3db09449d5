//! Repository for the `skipped_pages` table.

use sqlx::PgPool;

use crate::models::skipped_page::SkippedPage;

/// Column list for skipped_pages queries.
const COLUMNS: &str = "id, entity_type, page_number, reason, recorded_at";

/// Tracks pages that failed all retries during a phase.
pub struct SkippedPageRepo;

impl SkippedPageRepo {
    /// Record a skipped page. Re-recording the same page updates its reason.
    pub async fn record(
        pool: &PgPool,
        entity_type: &str,
        page_number: i32,
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO skipped_pages (entity_type, page_number, reason)
             VALUES ($1, $2, $3)
             ON CONFLICT (entity_type, page_number) DO UPDATE SET
                reason = EXCLUDED.reason,
                recorded_at = now()",
        )
        .bind(entity_type)
        .bind(page_number)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a page from the skipped list (after a successful retry).
    pub async fn remove(
        pool: &PgPool,
        entity_type: &str,
        page_number: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM skipped_pages WHERE entity_type = $1 AND page_number = $2")
            .bind(entity_type)
            .bind(page_number)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Page numbers skipped for one entity type, ascending.
    pub async fn pages_for_entity(
        pool: &PgPool,
        entity_type: &str,
    ) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT page_number FROM skipped_pages
             WHERE entity_type = $1
             ORDER BY page_number",
        )
        .bind(entity_type)
        .fetch_all(pool)
        .await
    }

    /// All skipped pages across entity types.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<SkippedPage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM skipped_pages ORDER BY entity_type, page_number"
        );
        sqlx::query_as::<_, SkippedPage>(&query).fetch_all(pool).await
    }
}
