//! Repository for the `games` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedGame;

use crate::models::game::Game;

/// Column list for games queries.
const COLUMNS: &str = "id, ext_id, tournament_ext_id, white_ext_id, black_ext_id, \
    result, round, created_at, updated_at";

/// Provides idempotent upserts and lookups for games.
pub struct GameRepo;

impl GameRepo {
    /// Upsert a game by its upstream id. Safe to replay.
    pub async fn upsert(pool: &PgPool, record: &ScrapedGame) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO games
                (ext_id, tournament_ext_id, white_ext_id, black_ext_id, result, round)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (ext_id) DO UPDATE SET
                tournament_ext_id = EXCLUDED.tournament_ext_id,
                white_ext_id = EXCLUDED.white_ext_id,
                black_ext_id = EXCLUDED.black_ext_id,
                result = EXCLUDED.result,
                round = EXCLUDED.round,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(record.tournament_ext_id)
        .bind(record.white_ext_id)
        .bind(record.black_ext_id)
        .bind(&record.result)
        .bind(record.round)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted games.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM games")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM games ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a game by its upstream id.
    pub async fn find_by_ext_id(pool: &PgPool, ext_id: i64) -> Result<Option<Game>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM games WHERE ext_id = $1");
        sqlx::query_as::<_, Game>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }

    /// Games referencing a player (white or black) that does not exist.
    pub async fn count_orphaned_player_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM games g
             WHERE NOT EXISTS (SELECT 1 FROM players p WHERE p.ext_id = g.white_ext_id)
                OR NOT EXISTS (SELECT 1 FROM players p WHERE p.ext_id = g.black_ext_id)",
        )
        .fetch_one(pool)
        .await
    }

    /// Games referencing a tournament that does not exist.
    pub async fn count_orphaned_tournament_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM games g
             WHERE NOT EXISTS
                (SELECT 1 FROM tournaments t WHERE t.ext_id = g.tournament_ext_id)",
        )
        .fetch_one(pool)
        .await
    }
}
