//! Tournament result row model.

use clubsync_core::record::ScrapedTournamentResult;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `tournament_results` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TournamentResult {
    pub id: DbId,
    pub ext_id: i64,
    pub tournament_ext_id: i64,
    pub player_ext_id: i64,
    pub rank: i32,
    pub points: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<TournamentResult> for ScrapedTournamentResult {
    fn from(row: TournamentResult) -> Self {
        Self {
            ext_id: row.ext_id,
            tournament_ext_id: row.tournament_ext_id,
            player_ext_id: row.player_ext_id,
            rank: row.rank,
            points: row.points,
        }
    }
}
