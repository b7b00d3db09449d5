//! Repository for the `tournament_results` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedTournamentResult;

use crate::models::tournament_result::TournamentResult;

/// Column list for tournament_results queries.
const COLUMNS: &str = "id, ext_id, tournament_ext_id, player_ext_id, rank, points, \
    created_at, updated_at";

/// Provides idempotent upserts and lookups for tournament standings.
pub struct TournamentResultRepo;

impl TournamentResultRepo {
    /// Upsert a result row by its upstream id. Safe to replay.
    pub async fn upsert(
        pool: &PgPool,
        record: &ScrapedTournamentResult,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO tournament_results
                (ext_id, tournament_ext_id, player_ext_id, rank, points)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (ext_id) DO UPDATE SET
                tournament_ext_id = EXCLUDED.tournament_ext_id,
                player_ext_id = EXCLUDED.player_ext_id,
                rank = EXCLUDED.rank,
                points = EXCLUDED.points,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(record.tournament_ext_id)
        .bind(record.player_ext_id)
        .bind(record.rank)
        .bind(record.points)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted result rows.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM tournament_results")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM tournament_results ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a result row by its upstream id.
    pub async fn find_by_ext_id(
        pool: &PgPool,
        ext_id: i64,
    ) -> Result<Option<TournamentResult>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tournament_results WHERE ext_id = $1");
        sqlx::query_as::<_, TournamentResult>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }

    /// Result rows referencing a tournament that does not exist.
    pub async fn count_orphaned_tournament_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM tournament_results r
             WHERE NOT EXISTS
                (SELECT 1 FROM tournaments t WHERE t.ext_id = r.tournament_ext_id)",
        )
        .fetch_one(pool)
        .await
    }

    /// Result rows referencing a player that does not exist.
    pub async fn count_orphaned_player_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM tournament_results r
             WHERE NOT EXISTS (SELECT 1 FROM players p WHERE p.ext_id = r.player_ext_id)",
        )
        .fetch_one(pool)
        .await
    }
}
