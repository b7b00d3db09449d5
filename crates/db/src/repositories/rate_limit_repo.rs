//! Repository for the `rate_limit_windows` table.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// Fixed-window request counter, one row per logical bucket.
pub struct RateLimitRepo;

impl RateLimitRepo {
    /// Count the current request into the bucket's window and return the
    /// post-increment `(request_count, window_start)`.
    ///
    /// If the stored window started before `now - window_ms` it has
    /// expired, and the counter restarts at 1 with a fresh window. The
    /// whole read-modify-write is a single statement, so concurrent
    /// callers cannot both observe the same count.
    pub async fn increment(
        pool: &PgPool,
        bucket: &str,
        window_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<(i32, DateTime<Utc>), sqlx::Error> {
        let cutoff = now - Duration::milliseconds(window_ms as i64);
        sqlx::query_as::<_, (i32, DateTime<Utc>)>(
            "INSERT INTO rate_limit_windows (bucket, window_start, request_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (bucket) DO UPDATE SET
                request_count = CASE
                    WHEN rate_limit_windows.window_start <= $3 THEN 1
                    ELSE rate_limit_windows.request_count + 1
                END,
                window_start = CASE
                    WHEN rate_limit_windows.window_start <= $3 THEN $2
                    ELSE rate_limit_windows.window_start
                END
             RETURNING request_count, window_start",
        )
        .bind(bucket)
        .bind(now)
        .bind(cutoff)
        .fetch_one(pool)
        .await
    }
}
