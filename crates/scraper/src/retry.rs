//! Bounded exponential-backoff retry around page fetches.
//!
//! Only transient errors (timeout, 5xx, connection failures) are
//! retried. Non-transient errors and cancellation return immediately.
//! When the attempt budget is exhausted the last transient error is
//! returned; the caller decides whether that demotes to a page skip or
//! fails the phase.

use tokio_util::sync::CancellationToken;

use clubsync_core::backoff::{next_delay, BackoffConfig};
use clubsync_core::entity::EntityType;
use clubsync_core::record::ScrapedRecord;

use crate::client::PageFetcher;
use crate::error::ScrapeError;

/// Fetch one page, retrying transient failures with exponential backoff.
pub async fn fetch_page_with_retry(
    fetcher: &dyn PageFetcher,
    entity: EntityType,
    page: u32,
    config: &BackoffConfig,
    cancel: &CancellationToken,
) -> Result<Vec<ScrapedRecord>, ScrapeError> {
    let mut delay = config.initial_delay;
    let mut last_error = ScrapeError::Unavailable("no fetch attempted".to_string());

    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        match fetcher.fetch_page(entity, page).await {
            Ok(records) => return Ok(records),
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    entity = %entity,
                    page,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Transient fetch failure",
                );
                last_error = e;
            }
            Err(e) => return Err(e),
        }

        // Wait before the next attempt, respecting cancellation.
        if attempt < config.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, config);
        }
    }

    tracing::warn!(
        entity = %entity,
        page,
        attempts = config.max_attempts,
        error = %last_error,
        "Fetch attempts exhausted",
    );
    Err(last_error)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
