//! Club row model.

use clubsync_core::record::ScrapedClub;
use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clubs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Club {
    pub id: DbId,
    pub ext_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub founded_year: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Club> for ScrapedClub {
    fn from(row: Club) -> Self {
        Self {
            ext_id: row.ext_id,
            name: row.name,
            city: row.city,
            founded_year: row.founded_year,
        }
    }
}
