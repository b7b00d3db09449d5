//! Error type for the import engine.

use clubsync_core::types::DbId;
use clubsync_scraper::ScrapeError;

/// Errors surfaced by the import engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another import currently holds the advisory lock. Expected under
    /// contention; maps to HTTP 409 at the API layer.
    #[error("Import already in progress")]
    LockHeld,

    /// The referenced import run does not exist.
    #[error("Import run {0} not found")]
    RunNotFound(DbId),

    /// The persistence store failed; the run cannot make progress.
    #[error("Persistence error: {0}")]
    Store(String),

    /// An upstream fetch error that could not be contained at page level.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// The run exceeded its wall-clock budget and was self-cancelled.
    #[error("Import timed out after {0} seconds")]
    Timeout(u64),
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}
