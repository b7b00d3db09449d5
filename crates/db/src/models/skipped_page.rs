//! Skipped page row model.

use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `skipped_pages` table: a page that failed all retries
/// during a phase, deferred for explicit retry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SkippedPage {
    pub id: DbId,
    pub entity_type: String,
    pub page_number: i32,
    pub reason: Option<String>,
    pub recorded_at: Timestamp,
}
