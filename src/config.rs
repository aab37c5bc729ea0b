//! Service configuration: environment variables plus an optional TOML game file.
//!
//! Environment:
//!   PORT              : u16 (default 8080)
//!   REDIS_URL         : ranked cache; the in-process set is used when absent
//!   STORE_TIMEOUT_MS  : per collaborator call (default 2000)
//!   GAME_CONFIG_PATH  : TOML with `[game]`, `[leaderboard]`, `[[scenes]]`, `[[words]]`
//!
//! Nothing here panics: bad values are logged and replaced by defaults.

use std::{fmt::Display, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{DubbingScene, Word};

const DEFAULT_REQUIRED_PROBABILITY: f64 = 0.7;

/// Knobs of the session generator and score recorder.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameTuning {
  pub adventure_word_count: usize,
  pub defense_word_count: usize,
  /// Chance that a drawn word is tagged core vocabulary. Not a guarantee.
  pub required_probability: f64,
  pub max_distractors: usize,
  /// Highest playable level; above it session requests are rejected.
  pub max_level: u32,
  /// Highest score a single submission may carry.
  pub max_score: i64,
}

impl Default for GameTuning {
  fn default() -> Self {
    Self {
      adventure_word_count: 10,
      defense_word_count: 10,
      required_probability: DEFAULT_REQUIRED_PROBABILITY,
      max_distractors: 3,
      max_level: 100,
      max_score: 1_000_000,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
  pub default_limit: usize,
  pub max_limit: usize,
  pub ranked_set_ttl_secs: u64,
}

impl Default for LeaderboardSettings {
  fn default() -> Self {
    Self { default_limit: 10, max_limit: 100, ranked_set_ttl_secs: 24 * 60 * 60 }
  }
}

impl LeaderboardSettings {
  pub fn ranked_set_ttl(&self) -> Duration { Duration::from_secs(self.ranked_set_ttl_secs) }
}

/// Schema of the TOML file named by GAME_CONFIG_PATH.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameFile {
  #[serde(default)] pub game: GameTuning,
  #[serde(default)] pub leaderboard: LeaderboardSettings,
  #[serde(default)] pub scenes: Vec<DubbingScene>,
  #[serde(default)] pub words: Vec<Word>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub redis_url: Option<String>,
  pub store_timeout: Duration,
  pub game: GameTuning,
  pub leaderboard: LeaderboardSettings,
  pub scenes: Vec<DubbingScene>,
  pub words: Vec<Word>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self::from_parts(8080, None, Duration::from_millis(2000), GameFile::default())
  }
}

impl AppConfig {
  pub fn load() -> Self {
    let file = load_game_file_from_env().unwrap_or_default();
    Self::from_parts(
      try_load("PORT", 8080),
      std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
      Duration::from_millis(try_load("STORE_TIMEOUT_MS", 2000)),
      file,
    )
  }

  fn from_parts(port: u16, redis_url: Option<String>, store_timeout: Duration, file: GameFile) -> Self {
    let mut game = file.game;
    let p = game.required_probability;
    if !p.is_finite() {
      warn!(target: "linguaforge", value = p, "required_probability is not a number; using default");
      game.required_probability = DEFAULT_REQUIRED_PROBABILITY;
    } else if !(0.0..=1.0).contains(&p) {
      warn!(target: "linguaforge", value = p, "required_probability out of [0, 1]; clamping");
      game.required_probability = p.clamp(0.0, 1.0);
    }
    game.max_level = game.max_level.max(1);
    game.max_score = game.max_score.max(0);
    let mut leaderboard = file.leaderboard;
    leaderboard.max_limit = leaderboard.max_limit.max(1);
    leaderboard.default_limit = leaderboard.default_limit.clamp(1, leaderboard.max_limit);

    Self { port, redis_url, store_timeout, game, leaderboard, scenes: file.scenes, words: file.words }
  }
}

fn try_load<T: FromStr>(key: &str, default: T) -> T
where
  T::Err: Display,
{
  match std::env::var(key) {
    Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
      warn!(target: "linguaforge", %key, error = %e, "Invalid value; using default");
      default
    }),
    Err(_) => default,
  }
}

/// Attempt to load `GameFile` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_file_from_env() -> Option<GameFile> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_game_file(&s) {
      Ok(cfg) => {
        info!(target: "linguaforge", %path, scenes = cfg.scenes.len(), words = cfg.words.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "linguaforge", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "linguaforge", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_game_file(s: &str) -> Result<GameFile, toml::de::Error> {
  toml::from_str::<GameFile>(s)
}
