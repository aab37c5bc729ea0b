//! Domain models: words, game types, generated sessions, durable records and leaderboard rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CoreError;

pub type PlayerId = i64;
pub type WordId = i64;

/// Reference word owned by the content catalogue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Word {
  pub id: WordId,
  pub english: String,
  pub translation: String,
  #[serde(default)] pub pronunciation: Option<String>,
  #[serde(default)] pub audio_url: Option<String>,
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub story: Option<String>,
  pub difficulty_level: u32,
  pub category: String,
}

/// The slice of a word the pool hands out for session generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWord {
  pub id: WordId,
  pub english: String,
  pub translation: String,
}

impl From<&Word> for PoolWord {
  fn from(w: &Word) -> Self {
    Self { id: w.id, english: w.english.clone(), translation: w.translation.clone() }
  }
}

/// A pool word tagged for one generated session. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRequirement {
  #[serde(flatten)]
  pub word: PoolWord,
  pub required: bool,
}

/// Player profile row as the player store keeps it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
  pub id: PlayerId,
  pub username: String,
  pub level: u32,
  pub experience: i64,
  pub coins: i64,
  #[serde(default)] pub preferred_category: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
  Adventure,
  Defense,
  Dubbing,
}

impl GameType {
  pub const ALL: [GameType; 3] = [GameType::Adventure, GameType::Defense, GameType::Dubbing];

  pub fn as_str(&self) -> &'static str {
    match self {
      GameType::Adventure => "adventure",
      GameType::Defense => "defense",
      GameType::Dubbing => "dubbing",
    }
  }
}

impl fmt::Display for GameType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for GameType {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "adventure" => Ok(GameType::Adventure),
      "defense" => Ok(GameType::Defense),
      "dubbing" => Ok(GameType::Dubbing),
      other => Err(CoreError::Validation(format!("invalid game type: {other:?}"))),
    }
  }
}

/// Ranking axis of a leaderboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingDimension {
  /// Cumulative experience.
  Overall,
  /// Best single score per game type.
  Adventure,
  Defense,
  Dubbing,
  /// Summed score over the last 7 days.
  Weekly,
  /// Summed score over the last calendar month.
  Monthly,
}

impl RankingDimension {
  pub const ALL: [RankingDimension; 6] = [
    RankingDimension::Overall,
    RankingDimension::Adventure,
    RankingDimension::Defense,
    RankingDimension::Dubbing,
    RankingDimension::Weekly,
    RankingDimension::Monthly,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      RankingDimension::Overall => "overall",
      RankingDimension::Adventure => "adventure",
      RankingDimension::Defense => "defense",
      RankingDimension::Dubbing => "dubbing",
      RankingDimension::Weekly => "weekly",
      RankingDimension::Monthly => "monthly",
    }
  }

  pub fn game_type(&self) -> Option<GameType> {
    match self {
      RankingDimension::Adventure => Some(GameType::Adventure),
      RankingDimension::Defense => Some(GameType::Defense),
      RankingDimension::Dubbing => Some(GameType::Dubbing),
      _ => None,
    }
  }

  /// Parse an optional query value; empty means overall.
  pub fn parse_or_default(raw: Option<&str>) -> Result<Self, CoreError> {
    match raw.map(str::trim) {
      None | Some("") => Ok(RankingDimension::Overall),
      Some(s) => s.parse(),
    }
  }
}

impl From<GameType> for RankingDimension {
  fn from(g: GameType) -> Self {
    match g {
      GameType::Adventure => RankingDimension::Adventure,
      GameType::Defense => RankingDimension::Defense,
      GameType::Dubbing => RankingDimension::Dubbing,
    }
  }
}

impl fmt::Display for RankingDimension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RankingDimension {
  type Err = CoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    RankingDimension::ALL
      .into_iter()
      .find(|d| d.as_str() == s.trim())
      .ok_or_else(|| CoreError::Validation(format!("invalid leaderboard type: {s:?}")))
  }
}

//
// Generated sessions
//

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdventureOption {
  pub id: u32,
  pub text: String,
  pub correct: bool,
  pub feedback: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdventureRound {
  pub target_word_id: WordId,
  /// Translation of the target; the player picks the matching English option.
  pub prompt: String,
  pub narrative: String,
  pub options: Vec<AdventureOption>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdventureSession {
  pub id: Uuid,
  pub player_id: PlayerId,
  pub current_level: u32,
  pub score: i64,
  pub words: Vec<WordRequirement>,
  pub rounds: Vec<AdventureRound>,
  pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefenseEnemy {
  pub id: u32,
  pub kind: String,
  pub health: u32,
  pub speed: u32,
  pub position: u32,
  pub word_id: Option<WordId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefenseTower {
  pub id: u32,
  pub kind: String,
  pub level: u32,
  pub damage: u32,
  pub range: u32,
  pub position: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefenseWord {
  pub id: WordId,
  pub english: String,
  pub translation: String,
  pub correct: bool,
  pub answered: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefenseSession {
  pub id: Uuid,
  pub player_id: PlayerId,
  pub current_wave: u32,
  pub score: i64,
  pub health: u32,
  pub coins: u32,
  pub enemies: Vec<DefenseEnemy>,
  pub towers: Vec<DefenseTower>,
  pub words: Vec<DefenseWord>,
  pub completed: bool,
}

/// One line of a dubbing scene as configured.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneLine {
  pub id: u32,
  pub character: String,
  pub text: String,
  pub audio_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DubbingScene {
  pub id: u32,
  #[serde(default)] pub title: String,
  pub scripts: Vec<SceneLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DubbingScript {
  pub id: u32,
  pub character: String,
  pub text: String,
  pub audio_url: String,
  pub user_audio_url: Option<String>,
  pub score: Option<i64>,
  pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DubbingSession {
  pub id: Uuid,
  pub player_id: PlayerId,
  pub scene_id: u32,
  pub score: i64,
  pub scripts: Vec<DubbingScript>,
  pub completed: bool,
}

/// Envelope for any generated session, tagged by game type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "game_type", rename_all = "snake_case")]
pub enum GameSession {
  Adventure(AdventureSession),
  Defense(DefenseSession),
  Dubbing(DubbingSession),
}

impl GameSession {
  pub fn game_type(&self) -> GameType {
    match self {
      GameSession::Adventure(_) => GameType::Adventure,
      GameSession::Defense(_) => GameType::Defense,
      GameSession::Dubbing(_) => GameType::Dubbing,
    }
  }
}

//
// Durable records
//

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubbingRef {
  pub scene_id: u32,
  pub script_id: u32,
}

/// Append-only outcome of one completed session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
  pub id: i64,
  pub player_id: PlayerId,
  pub game_type: GameType,
  pub score: i64,
  pub level_reached: u32,
  pub time_spent: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dubbing: Option<DubbingRef>,
  #[serde(with = "time::serde::rfc3339")]
  pub completed_at: OffsetDateTime,
}

/// Record fields supplied by the caller; the store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewGameRecord {
  pub player_id: PlayerId,
  pub game_type: GameType,
  pub score: i64,
  pub level_reached: u32,
  pub time_spent: u32,
  pub dubbing: Option<DubbingRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScoreSubmission {
  pub game_type: GameType,
  pub score: i64,
  #[serde(default)] pub level_reached: u32,
  #[serde(default)] pub time_spent: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DubbingSubmission {
  pub scene_id: u32,
  pub script_id: u32,
  pub audio_data: String,
  #[serde(default)] pub time_spent: u32,
}

/// Experience and coins granted for a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reward {
  pub experience: i64,
  pub coins: i64,
}

impl Reward {
  pub fn for_score(score: i64) -> Self {
    Self { experience: score / 10, coins: score / 20 }
  }

  pub fn is_empty(&self) -> bool { self.experience == 0 && self.coins == 0 }
}

//
// Leaderboards
//

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub player_id: PlayerId,
  pub username: String,
  /// Meaning depends on the dimension (experience, best score, windowed sum).
  pub score: i64,
  pub level: u32,
  pub experience: i64,
  pub rank: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardPage {
  #[serde(rename = "type")]
  pub dimension: RankingDimension,
  pub entries: Vec<LeaderboardEntry>,
  pub total: usize,
  #[serde(with = "time::serde::rfc3339")]
  pub updated_at: OffsetDateTime,
}

/// Result of a single-player rank lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserRank {
  Ranked(u64),
  Unranked,
}

impl UserRank {
  pub fn position(&self) -> Option<u64> {
    match self {
      UserRank::Ranked(r) => Some(*r),
      UserRank::Unranked => None,
    }
  }
}
