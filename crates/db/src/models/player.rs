//! Player row model.

use clubsync_core::record::ScrapedPlayer;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `players` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Player {
    pub id: DbId,
    pub ext_id: i64,
    pub name: String,
    pub club_ext_id: Option<i64>,
    pub rating: Option<f64>,
    pub games_played: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Player> for ScrapedPlayer {
    fn from(row: Player) -> Self {
        Self {
            ext_id: row.ext_id,
            name: row.name,
            club_ext_id: row.club_ext_id,
            rating: row.rating,
            games_played: row.games_played,
        }
    }
}
