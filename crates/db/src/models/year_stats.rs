//! Year statistics row model.

use clubsync_core::record::ScrapedYearStats;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `year_stats` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct YearStats {
    pub id: DbId,
    pub ext_id: i64,
    pub player_ext_id: i64,
    pub year: i32,
    pub games_played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub rating_end: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<YearStats> for ScrapedYearStats {
    fn from(row: YearStats) -> Self {
        Self {
            ext_id: row.ext_id,
            player_ext_id: row.player_ext_id,
            year: row.year,
            games_played: row.games_played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            rating_end: row.rating_end,
        }
    }
}
