//! Import run status, checkpoint data, and progress math.

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Import run status
// ---------------------------------------------------------------------------

/// Status of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ImportStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] =
        &["pending", "running", "completed", "failed", "cancelled"];

    /// A terminal status can never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Durable marker of the last successfully committed batch.
///
/// Written only after the batch it describes has been persisted, so a
/// restart replays at most one batch. `batch_index` is the upstream page
/// number of the last committed batch (pages are 1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub phase: EntityType,
    pub batch_index: u32,
    pub last_processed_id: Option<DbId>,
    pub progress_percent: i32,
}

impl Checkpoint {
    /// The page the phase should resume from after a restart.
    pub fn resume_page(&self) -> u32 {
        self.batch_index + 1
    }
}

// ---------------------------------------------------------------------------
// Progress math
// ---------------------------------------------------------------------------

/// Compute a 0-100 progress percentage from processed/total record counts.
///
/// Returns `0` when `total` is zero or negative; otherwise rounds to the
/// nearest integer and clamps to 100 (processed may briefly exceed an
/// estimated total).
pub fn progress_percent(processed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round() as i64;
    pct.clamp(0, 100) as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ImportStatus ---------------------------------------------------------

    #[test]
    fn status_round_trip() {
        for s in ImportStatus::ALL {
            let status = ImportStatus::from_str(s).unwrap();
            assert_eq!(status.as_str(), *s);
        }
    }

    #[test]
    fn status_unknown_returns_none() {
        assert!(ImportStatus::from_str("paused").is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(ImportStatus::Completed.is_terminal());
        assert!(ImportStatus::Failed.is_terminal());
        assert!(ImportStatus::Cancelled.is_terminal());
        assert!(!ImportStatus::Pending.is_terminal());
        assert!(!ImportStatus::Running.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", ImportStatus::Running), "running");
    }

    // -- Checkpoint -----------------------------------------------------------

    #[test]
    fn resume_page_is_next_page() {
        let cp = Checkpoint {
            phase: EntityType::Player,
            batch_index: 4,
            last_processed_id: Some(1042),
            progress_percent: 37,
        };
        assert_eq!(cp.resume_page(), 5);
    }

    #[test]
    fn checkpoint_serde_round_trip() {
        let cp = Checkpoint {
            phase: EntityType::Game,
            batch_index: 12,
            last_processed_id: None,
            progress_percent: 80,
        };
        let json = serde_json::to_string(&cp).unwrap();
        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cp);
    }

    // -- progress_percent -----------------------------------------------------

    #[test]
    fn zero_total_is_zero_percent() {
        assert_eq!(progress_percent(50, 0), 0);
    }

    #[test]
    fn half_done_rounds_to_fifty() {
        assert_eq!(progress_percent(50, 100), 50);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
    }

    #[test]
    fn clamps_when_processed_exceeds_estimate() {
        assert_eq!(progress_percent(150, 100), 100);
    }

    #[test]
    fn complete_is_one_hundred() {
        assert_eq!(progress_percent(100, 100), 100);
    }
}
