//! Game row model.

use clubsync_core::record::ScrapedGame;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `games` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Game {
    pub id: DbId,
    pub ext_id: i64,
    pub tournament_ext_id: i64,
    pub white_ext_id: i64,
    pub black_ext_id: i64,
    pub result: String,
    pub round: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Game> for ScrapedGame {
    fn from(row: Game) -> Self {
        Self {
            ext_id: row.ext_id,
            tournament_ext_id: row.tournament_ext_id,
            white_ext_id: row.white_ext_id,
            black_ext_id: row.black_ext_id,
            result: row.result,
            round: row.round,
        }
    }
}
