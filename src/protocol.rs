//! HTTP request/response DTOs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Enum-valued inputs (`game_type`, `type`) arrive as plain strings and are
//! parsed by the handlers so a bad value maps to a 400 validation error.

use serde::{Deserialize, Serialize};

use crate::domain::{GameRecord, PlayerId, RankingDimension};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct StartGameIn {
    pub game_type: String,
    /// Difficulty level; for dubbing, the scene id.
    #[serde(default)]
    pub level: u32,
}

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    #[serde(default)]
    pub level: u32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreIn {
    pub game_type: String,
    pub score: i64,
    #[serde(default)]
    pub level_reached: u32,
    #[serde(default)]
    pub time_spent: u32,
}

/// Defense submissions carry no game type.
#[derive(Debug, Deserialize)]
pub struct DefenseSubmitIn {
    pub score: i64,
    #[serde(default)]
    pub level_reached: u32,
    #[serde(default)]
    pub time_spent: u32,
}

#[derive(Serialize)]
pub struct RecordOut {
    pub message: &'static str,
    pub record: GameRecord,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub game_type: Option<String>,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub records: Vec<GameRecord>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type")]
    pub dimension: Option<String>,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct RankQuery {
    #[serde(rename = "type")]
    pub dimension: Option<String>,
}

#[derive(Serialize)]
pub struct RankOut {
    pub player_id: PlayerId,
    /// `null` when the player is not in the ranked set.
    pub rank: Option<u64>,
    #[serde(rename = "type")]
    pub dimension: RankingDimension,
}

#[derive(Serialize)]
pub struct CategoriesOut {
    pub categories: Vec<String>,
}
