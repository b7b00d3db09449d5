//! Tournament row model.

use clubsync_core::record::ScrapedTournament;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `tournaments` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tournament {
    pub id: DbId,
    pub ext_id: i64,
    pub name: String,
    pub club_ext_id: Option<i64>,
    pub starts_on: Option<chrono::NaiveDate>,
    pub rounds: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Tournament> for ScrapedTournament {
    fn from(row: Tournament) -> Self {
        Self {
            ext_id: row.ext_id,
            name: row.name,
            club_ext_id: row.club_ext_id,
            starts_on: row.starts_on,
            rounds: row.rounds,
        }
    }
}
