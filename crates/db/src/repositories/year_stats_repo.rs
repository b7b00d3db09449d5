//! Repository for the `year_stats` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedYearStats;

use crate::models::year_stats::YearStats;

/// Column list for year_stats queries.
const COLUMNS: &str = "id, ext_id, player_ext_id, year, games_played, wins, draws, \
    losses, rating_end, created_at, updated_at";

/// Provides idempotent upserts and lookups for yearly player statistics.
pub struct YearStatsRepo;

impl YearStatsRepo {
    /// Upsert a year-stats row by its upstream id. Safe to replay.
    pub async fn upsert(pool: &PgPool, record: &ScrapedYearStats) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO year_stats
                (ext_id, player_ext_id, year, games_played, wins, draws, losses, rating_end)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (ext_id) DO UPDATE SET
                player_ext_id = EXCLUDED.player_ext_id,
                year = EXCLUDED.year,
                games_played = EXCLUDED.games_played,
                wins = EXCLUDED.wins,
                draws = EXCLUDED.draws,
                losses = EXCLUDED.losses,
                rating_end = EXCLUDED.rating_end,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(record.player_ext_id)
        .bind(record.year)
        .bind(record.games_played)
        .bind(record.wins)
        .bind(record.draws)
        .bind(record.losses)
        .bind(record.rating_end)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted year-stats rows.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM year_stats")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM year_stats ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a year-stats row by its upstream id.
    pub async fn find_by_ext_id(
        pool: &PgPool,
        ext_id: i64,
    ) -> Result<Option<YearStats>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM year_stats WHERE ext_id = $1");
        sqlx::query_as::<_, YearStats>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }

    /// Stats rows referencing a player that does not exist.
    pub async fn count_orphaned_player_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM year_stats s
             WHERE NOT EXISTS (SELECT 1 FROM players p WHERE p.ext_id = s.player_ext_id)",
        )
        .fetch_one(pool)
        .await
    }
}
