//! Post-phase referential-integrity sweep.
//!
//! A fixed battery of orphan-detection checks runs after an import
//! completes (and on demand from the API). Failing checks are reported
//! as warnings and never block completion; re-running the import or
//! fixing the data manually is an operator decision.

use serde::Serialize;

use crate::error::SyncError;
use crate::store::ImportStore;

// ---------------------------------------------------------------------------
// Check battery
// ---------------------------------------------------------------------------

/// One orphan-detection check in the fixed battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityCheck {
    PlayersClub,
    GamesPlayers,
    GamesTournament,
    YearStatsPlayer,
    ResultsTournament,
    ResultsPlayer,
}

impl IntegrityCheck {
    /// All checks, in reporting order.
    pub const ALL: [IntegrityCheck; 6] = [
        Self::PlayersClub,
        Self::GamesPlayers,
        Self::GamesTournament,
        Self::YearStatsPlayer,
        Self::ResultsTournament,
        Self::ResultsPlayer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayersClub => "players_club",
            Self::GamesPlayers => "games_players",
            Self::GamesTournament => "games_tournament",
            Self::YearStatsPlayer => "year_stats_player",
            Self::ResultsTournament => "results_tournament",
            Self::ResultsPlayer => "results_player",
        }
    }

    /// Noun phrase describing what an orphan of this check is.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PlayersClub => "players referencing a club that does not exist",
            Self::GamesPlayers => "games referencing a player that does not exist",
            Self::GamesTournament => "games referencing a tournament that does not exist",
            Self::YearStatsPlayer => "year stats referencing a player that does not exist",
            Self::ResultsTournament => {
                "tournament results referencing a tournament that does not exist"
            }
            Self::ResultsPlayer => "tournament results referencing a player that does not exist",
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Overall sweep status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntegrityStatus {
    Pass,
    Fail,
}

/// Snapshot of one sweep. Derived, recomputed per check, never
/// partially updated.
#[derive(Debug, Clone, Serialize)]
pub struct IntegritySummary {
    pub status: IntegrityStatus,
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub issues: Vec<String>,
}

/// Build a summary from per-check orphan counts.
pub fn summarize(counts: &[(IntegrityCheck, i64)]) -> IntegritySummary {
    let mut issues = Vec::new();
    let mut failed = 0;

    for (check, orphans) in counts {
        if *orphans > 0 {
            failed += 1;
            issues.push(format!("{orphans} {}", check.description()));
        }
    }

    IntegritySummary {
        status: if failed == 0 {
            IntegrityStatus::Pass
        } else {
            IntegrityStatus::Fail
        },
        total_checks: counts.len(),
        passed_checks: counts.len() - failed,
        failed_checks: failed,
        issues,
    }
}

/// Run the full battery against the store.
pub async fn run_checks(store: &dyn ImportStore) -> Result<IntegritySummary, SyncError> {
    let counts = store.orphan_counts().await?;
    Ok(summarize(&counts))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
