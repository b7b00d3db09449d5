//! Repository for the `clubs` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedClub;

use crate::models::club::Club;

/// Column list for clubs queries.
const COLUMNS: &str = "id, ext_id, name, city, founded_year, created_at, updated_at";

/// Provides idempotent upserts and lookups for clubs.
pub struct ClubRepo;

impl ClubRepo {
    /// Upsert a club by its upstream id. Safe to replay.
    pub async fn upsert(pool: &PgPool, record: &ScrapedClub) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO clubs (ext_id, name, city, founded_year)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (ext_id) DO UPDATE SET
                name = EXCLUDED.name,
                city = EXCLUDED.city,
                founded_year = EXCLUDED.founded_year,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(&record.name)
        .bind(&record.city)
        .bind(record.founded_year)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted clubs.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM clubs")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM clubs ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a club by its upstream id.
    pub async fn find_by_ext_id(pool: &PgPool, ext_id: i64) -> Result<Option<Club>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clubs WHERE ext_id = $1");
        sqlx::query_as::<_, Club>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }
}
