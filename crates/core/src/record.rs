//! Typed records produced by the upstream scraper.
//!
//! The page-level DOM extraction lives behind the scraper crate's
//! `PageFetcher` boundary; these are the shapes it yields. Records
//! reference each other by upstream natural id (`ext_id`), never by
//! local database id, because referenced rows may not be persisted yet
//! when a record is scraped.

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// A club scraped from the upstream club index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedClub {
    pub ext_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub founded_year: Option<i32>,
}

/// A player scraped from the upstream player index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPlayer {
    pub ext_id: i64,
    pub name: String,
    /// Upstream id of the player's club, if any.
    pub club_ext_id: Option<i64>,
    pub rating: Option<f64>,
    pub games_played: i32,
}

/// A tournament scraped from the upstream tournament calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedTournament {
    pub ext_id: i64,
    pub name: String,
    /// Upstream id of the hosting club, if any.
    pub club_ext_id: Option<i64>,
    pub starts_on: Option<chrono::NaiveDate>,
    pub rounds: Option<i32>,
}

/// A single game result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedGame {
    pub ext_id: i64,
    pub tournament_ext_id: i64,
    pub white_ext_id: i64,
    pub black_ext_id: i64,
    /// One of `1-0`, `0-1`, `1/2-1/2`.
    pub result: String,
    pub round: Option<i32>,
}

/// Per-player aggregate statistics for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedYearStats {
    pub ext_id: i64,
    pub player_ext_id: i64,
    pub year: i32,
    pub games_played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub rating_end: Option<f64>,
}

/// A player's final standing in a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedTournamentResult {
    pub ext_id: i64,
    pub tournament_ext_id: i64,
    pub player_ext_id: i64,
    pub rank: i32,
    pub points: f64,
}

/// Valid game result strings.
pub const VALID_GAME_RESULTS: &[&str] = &["1-0", "0-1", "1/2-1/2"];

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// Any scraped record, tagged by entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScrapedRecord {
    Club(ScrapedClub),
    Player(ScrapedPlayer),
    Tournament(ScrapedTournament),
    Game(ScrapedGame),
    YearStats(ScrapedYearStats),
    TournamentResult(ScrapedTournamentResult),
}

impl ScrapedRecord {
    /// The entity type this record belongs to.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Club(_) => EntityType::Club,
            Self::Player(_) => EntityType::Player,
            Self::Tournament(_) => EntityType::Tournament,
            Self::Game(_) => EntityType::Game,
            Self::YearStats(_) => EntityType::YearStats,
            Self::TournamentResult(_) => EntityType::TournamentResult,
        }
    }

    /// The upstream natural id, used as the idempotent upsert key.
    pub fn ext_id(&self) -> i64 {
        match self {
            Self::Club(r) => r.ext_id,
            Self::Player(r) => r.ext_id,
            Self::Tournament(r) => r.ext_id,
            Self::Game(r) => r.ext_id,
            Self::YearStats(r) => r.ext_id,
            Self::TournamentResult(r) => r.ext_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
