//! Repository for the `advisory_locks` table.
//!
//! The lock is cooperative: holding the row means holding the lock.
//! Acquisition is a single conditional insert, so two concurrent
//! callers can never both observe "unlocked". Contention is a normal
//! `false` result, never an error.

use chrono::{Duration, Utc};
use sqlx::PgPool;

/// Provides atomic acquire/release for advisory locks.
pub struct AdvisoryLockRepo;

impl AdvisoryLockRepo {
    /// Try to acquire the lock identified by `key`.
    ///
    /// Rows older than `ttl_secs` are treated as stale (crashed holder)
    /// and reclaimed first. Returns `true` if this call newly acquired
    /// the lock, `false` if another holder has it.
    pub async fn acquire(
        pool: &PgPool,
        key: &str,
        holder: &str,
        ttl_secs: i64,
    ) -> Result<bool, sqlx::Error> {
        let stale_cutoff = Utc::now() - Duration::seconds(ttl_secs);
        sqlx::query("DELETE FROM advisory_locks WHERE key = $1 AND acquired_at < $2")
            .bind(key)
            .bind(stale_cutoff)
            .execute(pool)
            .await?;

        let result = sqlx::query(
            "INSERT INTO advisory_locks (key, holder) VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(holder)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Release the lock. Idempotent: releasing an unheld lock is a no-op.
    pub async fn release(pool: &PgPool, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM advisory_locks WHERE key = $1")
            .bind(key)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Current holder of the lock, if any.
    pub async fn holder(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT holder FROM advisory_locks WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }
}
