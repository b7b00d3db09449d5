//! Store-backed rate limiter for upstream fetches.
//!
//! Combines the pure fixed-window math with the store's atomic window
//! counter. When the counter store is unreachable the limiter fails
//! open: import availability is prioritized over strict enforcement.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use clubsync_core::ratelimit::{evaluate_window, RateLimitDecision};

use crate::store::ImportStore;

/// Bucket name used for all upstream scrape requests.
pub const SCRAPE_BUCKET: &str = "scrape-upstream";

/// Minimum wait between denied-check retries.
const MIN_WAIT: Duration = Duration::from_millis(50);

/// Throttles requests against a named bucket.
pub struct RateLimiter {
    store: Arc<dyn ImportStore>,
    bucket: String,
    window_ms: u64,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn ImportStore>,
        bucket: impl Into<String>,
        window_ms: u64,
        max_requests: u32,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            window_ms,
            max_requests,
        }
    }

    /// Check (and count) one request against the bucket.
    pub async fn check(&self) -> RateLimitDecision {
        let now = Utc::now();
        match self
            .store
            .increment_rate_bucket(&self.bucket, self.window_ms)
            .await
        {
            Ok((count, window_start)) => {
                evaluate_window(count, self.max_requests, window_start, self.window_ms, now)
            }
            Err(e) => {
                tracing::warn!(
                    bucket = %self.bucket,
                    error = %e,
                    "Rate limit store unavailable, failing open",
                );
                RateLimitDecision::fail_open(now, self.window_ms)
            }
        }
    }

    /// Wait until a request slot is available.
    ///
    /// Returns `false` if the cancellation token fired while waiting.
    pub async fn acquire_slot(&self, cancel: &CancellationToken) -> bool {
        loop {
            let decision = self.check().await;
            if decision.allowed {
                return true;
            }

            let wait = Duration::from_millis(decision.retry_after_ms.unwrap_or(self.window_ms))
                .max(MIN_WAIT);
            tracing::debug!(
                bucket = %self.bucket,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for window reset",
            );

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
