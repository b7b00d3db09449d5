//! Entity types handled by the import pipeline, their phase ordering,
//! and the import strategy selector.
//!
//! Phases run in a fixed dependency order: games reference players and
//! clubs, year stats reference players, and tournament results reference
//! tournaments and players, so prerequisite entities are always imported
//! first.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// One of the six entity types scraped from the upstream site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "clubs")]
    Club,
    #[serde(rename = "players")]
    Player,
    #[serde(rename = "tournaments")]
    Tournament,
    #[serde(rename = "games")]
    Game,
    #[serde(rename = "year_stats")]
    YearStats,
    #[serde(rename = "tournament_results")]
    TournamentResult,
}

impl EntityType {
    /// Return the entity type name as used in the database and API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Club => "clubs",
            Self::Player => "players",
            Self::Tournament => "tournaments",
            Self::Game => "games",
            Self::YearStats => "year_stats",
            Self::TournamentResult => "tournament_results",
        }
    }

    /// Parse an entity type string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "clubs" => Some(Self::Club),
            "players" => Some(Self::Player),
            "tournaments" => Some(Self::Tournament),
            "games" => Some(Self::Game),
            "year_stats" => Some(Self::YearStats),
            "tournament_results" => Some(Self::TournamentResult),
            _ => None,
        }
    }

    /// All entity types in import phase order.
    pub const ALL: [EntityType; 6] = [
        Self::Club,
        Self::Player,
        Self::Tournament,
        Self::Game,
        Self::YearStats,
        Self::TournamentResult,
    ];

    /// Entity types that must be fully imported before this one.
    pub fn prerequisites(&self) -> &'static [EntityType] {
        match self {
            Self::Club => &[],
            Self::Player => &[Self::Club],
            Self::Tournament => &[Self::Club, Self::Player],
            Self::Game => &[Self::Player, Self::Tournament],
            Self::YearStats => &[Self::Player],
            Self::TournamentResult => &[Self::Tournament, Self::Player],
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase execution order for a full import.
pub const PHASE_ORDER: [EntityType; 6] = EntityType::ALL;

// ---------------------------------------------------------------------------
// Import strategy
// ---------------------------------------------------------------------------

/// What to import: everything, or a single entity type.
///
/// Travels over the wire as its [`as_str`](Self::as_str) name; parsed
/// with [`parse`](Self::parse) rather than serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStrategy {
    Full,
    Single(EntityType),
}

impl ImportStrategy {
    /// Return the strategy name as stored on the import run.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Single(entity) => entity.as_str(),
        }
    }

    /// Parse a strategy string (`"full"` or any entity type name).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s == "full" {
            return Ok(Self::Full);
        }
        EntityType::from_str(s).map(Self::Single).ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown import strategy '{s}'. Valid strategies: full, {}",
                PHASE_ORDER.map(|e| e.as_str()).join(", ")
            ))
        })
    }

    /// The phases this strategy executes, in dependency order.
    pub fn phases(&self) -> Vec<EntityType> {
        match self {
            Self::Full => PHASE_ORDER.to_vec(),
            Self::Single(entity) => vec![*entity],
        }
    }
}

impl std::fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
