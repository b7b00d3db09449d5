//! Fixed-window rate limit math.
//!
//! The window counter itself lives in the database (one row per bucket);
//! this module turns a post-increment counter reading into an
//! allow/deny decision. The store-backed service in the sync crate is
//! responsible for the fail-open behaviour when the counter store is
//! unreachable.

use serde::Serialize;

use crate::types::Timestamp;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// When the current window ends and the counter resets.
    pub reset_at: Timestamp,
    /// How long to wait before retrying, set only when denied.
    pub retry_after_ms: Option<u64>,
}

impl RateLimitDecision {
    /// Decision used when the counter store is unavailable: the request
    /// is allowed so scraping availability wins over strict enforcement.
    pub fn fail_open(now: Timestamp, window_ms: u64) -> Self {
        Self {
            allowed: true,
            remaining: 0,
            reset_at: now + chrono::Duration::milliseconds(window_ms as i64),
            retry_after_ms: None,
        }
    }
}

/// Evaluate a fixed-window counter reading.
///
/// `count` is the number of requests in the current window including the
/// one being decided (the store increments before this is called).
pub fn evaluate_window(
    count: u32,
    max_requests: u32,
    window_start: Timestamp,
    window_ms: u64,
    now: Timestamp,
) -> RateLimitDecision {
    let reset_at = window_start + chrono::Duration::milliseconds(window_ms as i64);

    if count <= max_requests {
        RateLimitDecision {
            allowed: true,
            remaining: max_requests - count,
            reset_at,
            retry_after_ms: None,
        }
    } else {
        let retry_after_ms = (reset_at - now).num_milliseconds().max(0) as u64;
        RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at,
            retry_after_ms: Some(retry_after_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn first_request_allowed() {
        let now = Utc::now();
        let decision = evaluate_window(1, 10, now, 60_000, now);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
        assert!(decision.retry_after_ms.is_none());
    }

    #[test]
    fn last_request_in_window_allowed_with_zero_remaining() {
        let now = Utc::now();
        let decision = evaluate_window(10, 10, now, 60_000, now);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn request_over_limit_denied() {
        let now = Utc::now();
        let window_start = now - Duration::milliseconds(10_000);
        let decision = evaluate_window(11, 10, window_start, 60_000, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        let retry = decision.retry_after_ms.unwrap();
        // 50 s left in the window, allow some slack for rounding.
        assert!((49_000..=50_000).contains(&retry), "retry = {retry}");
    }

    #[test]
    fn retry_after_never_negative() {
        let now = Utc::now();
        let window_start = now - Duration::milliseconds(120_000);
        let decision = evaluate_window(11, 10, window_start, 60_000, now);
        assert_eq!(decision.retry_after_ms, Some(0));
    }

    #[test]
    fn reset_at_is_window_end() {
        let now = Utc::now();
        let decision = evaluate_window(1, 5, now, 30_000, now);
        assert_eq!(decision.reset_at, now + Duration::milliseconds(30_000));
    }

    #[test]
    fn fail_open_always_allows() {
        let now = Utc::now();
        let decision = RateLimitDecision::fail_open(now, 60_000);
        assert!(decision.allowed);
        assert!(decision.retry_after_ms.is_none());
    }
}
