//! Session generation for the three mini-games.
//!
//! Sessions are built from a word-pool draw and returned to the caller; nothing
//! is persisted. All randomness (word tagging, distractor choice, option order,
//! enemy kinds, session ids) comes from the `Rng` the caller passes in, so a
//! seeded generator reproduces a session exactly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::GameTuning;
use crate::domain::{
  AdventureOption, AdventureRound, AdventureSession, DefenseEnemy, DefenseSession, DefenseTower, DefenseWord,
  DubbingScene, DubbingScript, DubbingSession, GameSession, GameType, PlayerId, WordRequirement,
};
use crate::error::{CoreError, Dependency};
use crate::store::{with_timeout, PlayerStore, WordPool};

const CORRECT_FEEDBACK: &str = "Correct! You picked the right word.";
const WRONG_FEEDBACK: &str = "Not quite. Try again.";
const ENEMY_KINDS: [&str; 3] = ["spelling_error", "grammar_slip", "false_friend"];

pub const START_WAVE: u32 = 1;
pub const START_HEALTH: u32 = 100;
pub const START_COINS: u32 = 50;

/// Ordered script lists per dubbing scene.
#[derive(Clone, Debug, Default)]
pub struct SceneCatalog {
  scenes: HashMap<u32, DubbingScene>,
}

impl SceneCatalog {
  /// Later scenes replace earlier ones with the same id.
  pub fn new(scenes: impl IntoIterator<Item = DubbingScene>) -> Self {
    Self { scenes: scenes.into_iter().map(|s| (s.id, s)).collect() }
  }

  pub fn get(&self, scene_id: u32) -> Option<&DubbingScene> { self.scenes.get(&scene_id) }

  pub fn len(&self) -> usize { self.scenes.len() }

  pub fn is_empty(&self) -> bool { self.scenes.is_empty() }
}

pub fn enemy_count(level: u32) -> usize { (level as usize).saturating_mul(2).saturating_add(5) }

pub fn tower_count(level: u32) -> usize { (level as usize).saturating_add(3) }

/// Level 0 means "not given" and plays as level 1.
pub fn normalize_level(level: u32) -> u32 { level.max(1) }

/// `base + per_level * level`, pinned at `u32::MAX`.
fn scaled(base: u32, per_level: u32, level: u32) -> u32 {
  per_level.saturating_mul(level).saturating_add(base)
}

fn session_id<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
  uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

pub struct SessionGenerator {
  words: Arc<dyn WordPool>,
  players: Arc<dyn PlayerStore>,
  scenes: Arc<SceneCatalog>,
  tuning: GameTuning,
  timeout: Duration,
}

impl SessionGenerator {
  pub fn new(
    words: Arc<dyn WordPool>,
    players: Arc<dyn PlayerStore>,
    scenes: Arc<SceneCatalog>,
    tuning: GameTuning,
    timeout: Duration,
  ) -> Self {
    Self { words, players, scenes, tuning, timeout }
  }

  /// Dispatch on game type. For dubbing, `level` carries the scene id.
  pub async fn generate<R: Rng + Send>(
    &self,
    game_type: GameType,
    player_id: PlayerId,
    level: u32,
    rng: &mut R,
  ) -> Result<GameSession, CoreError> {
    Ok(match game_type {
      GameType::Adventure => GameSession::Adventure(self.adventure(player_id, level, rng).await?),
      GameType::Defense => GameSession::Defense(self.defense(player_id, level, rng).await?),
      GameType::Dubbing => GameSession::Dubbing(self.dubbing(player_id, level, rng)?),
    })
  }

  #[instrument(level = "info", skip(self, rng), fields(%player_id))]
  pub async fn adventure<R: Rng + Send>(
    &self,
    player_id: PlayerId,
    level: u32,
    rng: &mut R,
  ) -> Result<AdventureSession, CoreError> {
    let level = self.playable_level(level)?;
    let category = self.preferred_category(player_id).await?;
    let words = self
      .draw_words(self.tuning.adventure_word_count, level, category.as_deref(), rng)
      .await?;

    let mut rounds = Vec::with_capacity(words.len());
    for idx in 0..words.len() {
      let target = WordRequirement { word: words[idx].word.clone(), required: true };
      let distractors = pick_distractors(&words, idx, self.tuning.max_distractors, rng);
      let narrative = self.narrative(category.as_deref(), &target, &distractors).await?;
      let options = build_options(&target, &distractors, rng);
      rounds.push(AdventureRound {
        target_word_id: target.word.id,
        prompt: target.word.translation.clone(),
        narrative,
        options,
      });
    }

    info!(target: "session", %player_id, level, words = words.len(), rounds = rounds.len(), "adventure session generated");
    Ok(AdventureSession {
      id: session_id(rng),
      player_id,
      current_level: level,
      score: 0,
      words,
      rounds,
      completed: false,
    })
  }

  #[instrument(level = "info", skip(self, rng), fields(%player_id))]
  pub async fn defense<R: Rng + Send>(
    &self,
    player_id: PlayerId,
    level: u32,
    rng: &mut R,
  ) -> Result<DefenseSession, CoreError> {
    let level = self.playable_level(level)?;
    let category = self.preferred_category(player_id).await?;
    let drawn = self
      .draw_words(self.tuning.defense_word_count, level, category.as_deref(), rng)
      .await?;

    let words: Vec<DefenseWord> = drawn
      .into_iter()
      .map(|w| DefenseWord {
        id: w.word.id,
        english: w.word.english,
        translation: w.word.translation,
        correct: w.required,
        answered: false,
      })
      .collect();
    let enemies = generate_enemies(level, &words, rng);
    let towers = generate_towers(level);

    info!(target: "session", %player_id, level, words = words.len(), enemies = enemies.len(), towers = towers.len(), "defense session generated");
    Ok(DefenseSession {
      id: session_id(rng),
      player_id,
      current_wave: START_WAVE,
      score: 0,
      health: START_HEALTH,
      coins: START_COINS,
      enemies,
      towers,
      words,
      completed: false,
    })
  }

  #[instrument(level = "info", skip(self, rng), fields(%player_id))]
  pub fn dubbing<R: Rng + ?Sized>(
    &self,
    player_id: PlayerId,
    scene_id: u32,
    rng: &mut R,
  ) -> Result<DubbingSession, CoreError> {
    let scene = self
      .scenes
      .get(scene_id)
      .ok_or_else(|| CoreError::NotFound(format!("scene {scene_id}")))?;
    let scripts = scene
      .scripts
      .iter()
      .map(|l| DubbingScript {
        id: l.id,
        character: l.character.clone(),
        text: l.text.clone(),
        audio_url: l.audio_url.clone(),
        user_audio_url: None,
        score: None,
        completed: false,
      })
      .collect::<Vec<_>>();

    info!(target: "session", %player_id, scene_id, scripts = scripts.len(), "dubbing session generated");
    Ok(DubbingSession { id: session_id(rng), player_id, scene_id, score: 0, scripts, completed: false })
  }

  /// Normalized level, or a validation error above the configured maximum.
  fn playable_level(&self, level: u32) -> Result<u32, CoreError> {
    let level = normalize_level(level);
    if level > self.tuning.max_level {
      return Err(CoreError::Validation(format!("level {level} is above the maximum of {}", self.tuning.max_level)));
    }
    Ok(level)
  }

  async fn preferred_category(&self, player_id: PlayerId) -> Result<Option<String>, CoreError> {
    with_timeout(Dependency::PlayerStore, self.timeout, self.players.preferred_category(player_id)).await
  }

  async fn draw_words<R: Rng + Send>(
    &self,
    count: usize,
    level: u32,
    category: Option<&str>,
    rng: &mut R,
  ) -> Result<Vec<WordRequirement>, CoreError> {
    let pool = with_timeout(Dependency::WordPool, self.timeout, self.words.random_words(count, level, category)).await?;
    let p = self.tuning.required_probability;
    Ok(pool
      .into_iter()
      .map(|word| WordRequirement { word, required: rng.gen_bool(p) })
      .collect())
  }

  /// Word story of any word in the round, else a story of the category, else empty.
  async fn narrative(
    &self,
    category: Option<&str>,
    target: &WordRequirement,
    distractors: &[WordRequirement],
  ) -> Result<String, CoreError> {
    for w in std::iter::once(target).chain(distractors) {
      let story = with_timeout(Dependency::WordPool, self.timeout, self.words.word_story(w.word.id)).await?;
      if let Some(s) = story {
        return Ok(s);
      }
    }
    if let Some(c) = category {
      if let Some(s) = with_timeout(Dependency::WordPool, self.timeout, self.words.category_story(c)).await? {
        return Ok(s);
      }
    }
    debug!(target: "session", word_id = target.word.id, "no story for round");
    Ok(String::new())
  }
}

/// Up to `max` words other than `words[target]`, tagged not-required.
pub fn pick_distractors<R: Rng + ?Sized>(
  words: &[WordRequirement],
  target: usize,
  max: usize,
  rng: &mut R,
) -> Vec<WordRequirement> {
  let others: Vec<&WordRequirement> = words
    .iter()
    .enumerate()
    .filter(|(i, _)| *i != target)
    .map(|(_, w)| w)
    .collect();
  others
    .choose_multiple(rng, max)
    .map(|w| WordRequirement { word: w.word.clone(), required: false })
    .collect()
}

/// Target plus distractors as shuffled options; only the target is correct.
pub fn build_options<R: Rng + ?Sized>(
  target: &WordRequirement,
  distractors: &[WordRequirement],
  rng: &mut R,
) -> Vec<AdventureOption> {
  let mut options: Vec<AdventureOption> = std::iter::once(target)
    .chain(distractors)
    .enumerate()
    .map(|(idx, w)| {
      let correct = w.word.id == target.word.id;
      AdventureOption {
        id: idx as u32 + 1,
        text: w.word.english.clone(),
        correct,
        feedback: if correct { CORRECT_FEEDBACK } else { WRONG_FEEDBACK }.to_string(),
      }
    })
    .collect();
  options.shuffle(rng);
  options
}

pub fn generate_enemies<R: Rng + ?Sized>(level: u32, words: &[DefenseWord], rng: &mut R) -> Vec<DefenseEnemy> {
  (0..enemy_count(level))
    .map(|i| DefenseEnemy {
      id: i as u32 + 1,
      kind: ENEMY_KINDS[rng.gen_range(0..ENEMY_KINDS.len())].to_string(),
      health: scaled(10, 5, level),
      speed: scaled(1, 1, level),
      position: u32::try_from(i).unwrap_or(u32::MAX).saturating_mul(10),
      word_id: (!words.is_empty()).then(|| words[i % words.len()].id),
    })
    .collect()
}

pub fn generate_towers(level: u32) -> Vec<DefenseTower> {
  (0..tower_count(level))
    .map(|i| DefenseTower {
      id: i as u32 + 1,
      kind: "grammar_tower".to_string(),
      level: 1,
      damage: scaled(5, 2, level),
      range: scaled(50, 5, level),
      position: u32::try_from(i).unwrap_or(u32::MAX).saturating_mul(100),
    })
    .collect()
}
