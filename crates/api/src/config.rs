//! Server and sync-engine configuration from environment variables.

use std::time::Duration;

use clubsync_core::backoff::BackoffConfig;
use clubsync_sync::SyncConfig;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }
}

/// Upstream scraping configuration loaded from environment variables.
///
/// | Env Var                     | Default  |
/// |-----------------------------|----------|
/// | `SCRAPE_BASE_URL`           | (none, required) |
/// | `SCRAPE_TIMEOUT_SECS`       | `20`     |
/// | `SCRAPE_PAGE_SIZE`          | `100`    |
/// | `SCRAPE_RATE_WINDOW_MS`     | `60000`  |
/// | `SCRAPE_RATE_MAX_REQUESTS`  | `30`     |
/// | `SYNC_MAX_RUN_SECS`         | `7200`   |
/// | `SYNC_LOCK_TTL_SECS`        | `3600`   |
/// | `SYNC_ALERT_WEBHOOK_URL`    | (none, alerts logged only) |
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub lock_ttl_secs: i64,
    pub alert_webhook_url: Option<String>,
    pub sync: SyncConfig,
}

impl ScrapeConfig {
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("SCRAPE_BASE_URL").expect("SCRAPE_BASE_URL must be set");

        let sync = SyncConfig {
            backoff: BackoffConfig::default(),
            rate_limit_window_ms: env_parse("SCRAPE_RATE_WINDOW_MS", 60_000),
            rate_limit_max_requests: env_parse("SCRAPE_RATE_MAX_REQUESTS", 30),
            max_run_secs: env_parse("SYNC_MAX_RUN_SECS", 7_200),
        };

        Self {
            base_url,
            request_timeout: Duration::from_secs(env_parse("SCRAPE_TIMEOUT_SECS", 20)),
            page_size: env_parse("SCRAPE_PAGE_SIZE", 100),
            lock_ttl_secs: env_parse("SYNC_LOCK_TTL_SECS", 3_600),
            alert_webhook_url: std::env::var("SYNC_ALERT_WEBHOOK_URL").ok(),
            sync,
        }
    }
}
