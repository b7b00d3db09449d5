//! Repository for the `tournaments` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedTournament;

use crate::models::tournament::Tournament;

/// Column list for tournaments queries.
const COLUMNS: &str = "id, ext_id, name, club_ext_id, starts_on, rounds, created_at, updated_at";

/// Provides idempotent upserts and lookups for tournaments.
pub struct TournamentRepo;

impl TournamentRepo {
    /// Upsert a tournament by its upstream id. Safe to replay.
    pub async fn upsert(pool: &PgPool, record: &ScrapedTournament) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO tournaments (ext_id, name, club_ext_id, starts_on, rounds)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (ext_id) DO UPDATE SET
                name = EXCLUDED.name,
                club_ext_id = EXCLUDED.club_ext_id,
                starts_on = EXCLUDED.starts_on,
                rounds = EXCLUDED.rounds,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(&record.name)
        .bind(record.club_ext_id)
        .bind(record.starts_on)
        .bind(record.rounds)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted tournaments.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM tournaments")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM tournaments ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a tournament by its upstream id.
    pub async fn find_by_ext_id(
        pool: &PgPool,
        ext_id: i64,
    ) -> Result<Option<Tournament>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tournaments WHERE ext_id = $1");
        sqlx::query_as::<_, Tournament>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }
}
