//! Classified errors for upstream fetches.

/// Errors that can occur while fetching from the upstream site.
///
/// Transient variants are retried with backoff; the rest are surfaced
/// to the phase immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScrapeError {
    /// The request exceeded the configured timeout.
    #[error("Upstream request timed out")]
    Timeout,

    /// The upstream returned a non-success HTTP status.
    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    /// The requested page or record does not exist.
    #[error("Not found upstream")]
    NotFound,

    /// The page was fetched but could not be decoded into records.
    #[error("Malformed page payload: {0}")]
    Malformed(String),

    /// The upstream site could not be reached at all.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// The fetch was abandoned because the import was cancelled.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// Whether a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Unavailable(_) => true,
            Self::Status(code) => (500..=599).contains(code),
            Self::NotFound | Self::Malformed(_) | Self::Cancelled => false,
        }
    }

    /// Operator-facing guidance for this error class.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => {
                "The upstream site is unreachable. Wait for it to recover, then retry the import; \
                 it will resume from the last checkpoint."
            }
            Self::Timeout | Self::Status(_) => {
                "The upstream site is responding slowly or erroring. Affected pages were skipped \
                 and can be retried individually."
            }
            Self::Malformed(_) => {
                "The upstream page layout may have changed; the extraction rules need review."
            }
            Self::NotFound => "The requested page does not exist upstream.",
            Self::Cancelled => "The fetch was cancelled.",
        }
    }

    /// Classify a transport-level reqwest error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_connect() {
            return Self::Unavailable(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        Self::Unavailable(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
