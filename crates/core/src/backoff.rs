//! Exponential-backoff policy for upstream fetches.
//!
//! A transient failure (timeout, 5xx, connection reset) is retried with
//! increasing delays up to a bounded attempt count. Exhaustion is
//! classified by the caller as a page skip or a phase failure; this
//! module only provides the delay schedule.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Total number of fetch attempts (initial try + retries).
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 4,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = BackoffConfig::default();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn next_delay_already_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(30), &config);
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn custom_multiplier() {
        let config = BackoffConfig {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = BackoffConfig::default();
        let mut delay = config.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[test]
    fn default_attempt_budget() {
        assert_eq!(BackoffConfig::default().max_attempts, 4);
    }
}
