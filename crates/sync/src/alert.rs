//! Best-effort admin alerting for failed imports.
//!
//! Delivery failures are logged and swallowed by the orchestrator so
//! they can never mask the original run error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use clubsync_core::types::{DbId, Timestamp};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for alert delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Alert webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Alert payload and sender trait
// ---------------------------------------------------------------------------

/// Payload describing a failed import run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailureAlert {
    pub import_id: DbId,
    pub started_at: Option<Timestamp>,
    pub error: String,
    pub records_processed: i64,
}

/// Sends failure alerts to the operators.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send_sync_failure(&self, alert: &SyncFailureAlert) -> Result<(), AlertError>;
}

// ---------------------------------------------------------------------------
// Webhook implementation
// ---------------------------------------------------------------------------

/// Delivers alerts to an external webhook endpoint with retry.
///
/// Constructed with `None` when no webhook is configured, in which case
/// alerts are logged locally and delivery always succeeds.
pub struct WebhookAlertSender {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookAlertSender {
    /// Create a new sender with a pre-configured HTTP client.
    pub fn new(url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, url }
    }

    async fn try_send(&self, url: &str, alert: &SyncFailureAlert) -> Result<(), AlertError> {
        let response = self.client.post(url).json(alert).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSender for WebhookAlertSender {
    /// Deliver the alert with retry.
    ///
    /// Retries up to 3 times with exponential backoff before giving up.
    /// Returns `Ok(())` on the first successful attempt.
    async fn send_sync_failure(&self, alert: &SyncFailureAlert) -> Result<(), AlertError> {
        let Some(url) = self.url.as_deref() else {
            tracing::warn!(
                import_id = alert.import_id,
                error = %alert.error,
                "Import failed; no alert webhook configured",
            );
            return Ok(());
        };

        let mut last_err: Option<AlertError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(url, alert).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Alert delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        Err(last_err.unwrap_or(AlertError::HttpStatus(0)))
    }
}
