//! Recording completed sessions and granting rewards.
//!
//! A submission appends a `GameRecord` and then increments the player's
//! experience (score / 10) and coins (score / 20). If the increment fails after
//! the append succeeded, the caller gets a `ConsistencyFault` naming the orphan
//! record. Once both writes land, the player's ranked-set standings are refreshed.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{error, info, instrument};

use crate::domain::{DubbingRef, DubbingSubmission, GameRecord, GameType, NewGameRecord, PlayerId, Reward, ScoreSubmission};
use crate::error::{CoreError, Dependency};
use crate::leaderboard::Leaderboard;
use crate::session::SceneCatalog;
use crate::store::{with_timeout, PlayerStore, RecordStore};

const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 100;

pub struct ScoreRecorder {
  players: Arc<dyn PlayerStore>,
  records: Arc<dyn RecordStore>,
  leaderboard: Arc<Leaderboard>,
  scenes: Arc<SceneCatalog>,
  max_score: i64,
  timeout: Duration,
}

impl ScoreRecorder {
  pub fn new(
    players: Arc<dyn PlayerStore>,
    records: Arc<dyn RecordStore>,
    leaderboard: Arc<Leaderboard>,
    scenes: Arc<SceneCatalog>,
    max_score: i64,
    timeout: Duration,
  ) -> Self {
    Self { players, records, leaderboard, scenes, max_score, timeout }
  }

  #[instrument(level = "info", skip(self, submission), fields(%player_id, game_type = %submission.game_type, score = submission.score))]
  pub async fn submit_score(&self, player_id: PlayerId, submission: ScoreSubmission) -> Result<GameRecord, CoreError> {
    if submission.score < 0 {
      return Err(CoreError::Validation(format!("score must not be negative, got {}", submission.score)));
    }
    if submission.score > self.max_score {
      return Err(CoreError::Validation(format!(
        "score {} is above the maximum of {}",
        submission.score, self.max_score
      )));
    }
    self.ensure_player(player_id).await?;

    let record = self
      .append(NewGameRecord {
        player_id,
        game_type: submission.game_type,
        score: submission.score,
        level_reached: submission.level_reached,
        time_spent: submission.time_spent,
        dubbing: None,
      })
      .await?;

    let reward = Reward::for_score(submission.score);
    if !reward.is_empty() {
      let increment = with_timeout(
        Dependency::PlayerStore,
        self.timeout,
        self.players.increment_experience_and_coins(player_id, reward.experience, reward.coins),
      )
      .await;
      if let Err(e) = increment {
        error!(target: "scoring", %player_id, record_id = record.id, error = %e, "reward increment failed after record append");
        return Err(CoreError::ConsistencyFault { player_id, record_id: record.id, reason: e.to_string() });
      }
    }

    info!(target: "scoring", %player_id, record_id = record.id, experience = reward.experience, coins = reward.coins, "score recorded");
    self.leaderboard.refresh_standing(player_id, record.game_type).await;
    Ok(record)
  }

  /// Store a zero-score dubbing completion pending automated scoring.
  #[instrument(level = "info", skip(self, submission), fields(%player_id, scene_id = submission.scene_id, script_id = submission.script_id))]
  pub async fn submit_dubbing(&self, player_id: PlayerId, submission: DubbingSubmission) -> Result<GameRecord, CoreError> {
    let audio = submission.audio_data.trim();
    if audio.is_empty() {
      return Err(CoreError::Validation("audio_data is empty".into()));
    }
    let bytes = STANDARD
      .decode(audio)
      .map_err(|e| CoreError::Validation(format!("audio_data is not valid base64: {e}")))?;

    let scene = self
      .scenes
      .get(submission.scene_id)
      .ok_or_else(|| CoreError::NotFound(format!("scene {}", submission.scene_id)))?;
    if !scene.scripts.iter().any(|l| l.id == submission.script_id) {
      return Err(CoreError::NotFound(format!("script {} in scene {}", submission.script_id, submission.scene_id)));
    }
    self.ensure_player(player_id).await?;

    let record = self
      .append(NewGameRecord {
        player_id,
        game_type: GameType::Dubbing,
        score: 0,
        level_reached: 0,
        time_spent: submission.time_spent,
        dubbing: Some(DubbingRef { scene_id: submission.scene_id, script_id: submission.script_id }),
      })
      .await?;

    info!(target: "scoring", %player_id, record_id = record.id, audio_bytes = bytes.len(), "dubbing recorded");
    self.leaderboard.refresh_standing(player_id, GameType::Dubbing).await;
    Ok(record)
  }

  /// Newest first; `limit <= 0` takes the default.
  pub async fn history(&self, player_id: PlayerId, game_type: Option<GameType>, limit: i64) -> Result<Vec<GameRecord>, CoreError> {
    let limit = if limit <= 0 { DEFAULT_HISTORY_LIMIT } else { (limit as usize).min(MAX_HISTORY_LIMIT) };
    with_timeout(Dependency::RecordStore, self.timeout, self.records.game_history(player_id, game_type, limit)).await
  }

  async fn ensure_player(&self, player_id: PlayerId) -> Result<(), CoreError> {
    with_timeout(Dependency::PlayerStore, self.timeout, self.players.username(player_id)).await.map(|_| ())
  }

  async fn append(&self, record: NewGameRecord) -> Result<GameRecord, CoreError> {
    with_timeout(Dependency::RecordStore, self.timeout, self.records.append_game_record(record)).await
  }
}
