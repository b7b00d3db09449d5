//! Repository for the `players` table.

use sqlx::PgPool;

use clubsync_core::record::ScrapedPlayer;

use crate::models::player::Player;

/// Column list for players queries.
const COLUMNS: &str =
    "id, ext_id, name, club_ext_id, rating, games_played, created_at, updated_at";

/// Provides idempotent upserts and lookups for players.
pub struct PlayerRepo;

impl PlayerRepo {
    /// Upsert a player by its upstream id. Safe to replay.
    pub async fn upsert(pool: &PgPool, record: &ScrapedPlayer) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO players (ext_id, name, club_ext_id, rating, games_played)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (ext_id) DO UPDATE SET
                name = EXCLUDED.name,
                club_ext_id = EXCLUDED.club_ext_id,
                rating = EXCLUDED.rating,
                games_played = EXCLUDED.games_played,
                updated_at = now()",
        )
        .bind(record.ext_id)
        .bind(&record.name)
        .bind(record.club_ext_id)
        .bind(record.rating)
        .bind(record.games_played)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted players.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM players")
            .fetch_one(pool)
            .await
    }

    /// An unbiased random sample of upstream ids.
    pub async fn sample_ext_ids(pool: &PgPool, n: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT ext_id FROM players ORDER BY random() LIMIT $1")
            .bind(n)
            .fetch_all(pool)
            .await
    }

    /// Find a player by its upstream id.
    pub async fn find_by_ext_id(pool: &PgPool, ext_id: i64) -> Result<Option<Player>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM players WHERE ext_id = $1");
        sqlx::query_as::<_, Player>(&query)
            .bind(ext_id)
            .fetch_optional(pool)
            .await
    }

    /// Players whose club reference points at a club that does not exist.
    pub async fn count_orphaned_club_refs(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT count(*) FROM players p
             WHERE p.club_ext_id IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM clubs c WHERE c.ext_id = p.club_ext_id)",
        )
        .fetch_one(pool)
        .await
    }
}
