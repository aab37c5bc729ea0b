//! In-process relational store: words, players and game records behind one lock.
//!
//! Mirrors the queries of the SQL deployment (random word draw, reward
//! increment, MAX/SUM aggregates) so the core can run and be tested without a
//! database. Ties in aggregates keep player-id order.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use super::{AggregateQuery, AggregateRow, PlayerStore, RecordStore, TimeWindow, WordPool};
use crate::domain::{
    GameRecord, GameType, NewGameRecord, Player, PlayerId, PoolWord, RankingDimension, Word, WordId,
};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    words: Vec<Word>,
    players: BTreeMap<PlayerId, Player>,
    records: Vec<GameRecord>,
    next_record_id: i64,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    rng: Mutex<StdRng>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic word draws, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tables: RwLock::new(Tables { next_record_id: 1, ..Tables::default() }),
            rng: Mutex::new(rng),
        }
    }

    pub async fn insert_word(&self, word: Word) {
        let mut t = self.tables.write().await;
        t.words.retain(|w| w.id != word.id);
        t.words.push(word);
    }

    pub async fn insert_player(&self, player: Player) {
        self.tables.write().await.players.insert(player.id, player);
    }

    pub async fn player(&self, player_id: PlayerId) -> Option<Player> {
        self.tables.read().await.players.get(&player_id).cloned()
    }

    /// Append a record with an explicit completion time (imports and backfills).
    pub async fn insert_record_at(&self, record: NewGameRecord, completed_at: OffsetDateTime) -> GameRecord {
        let mut t = self.tables.write().await;
        let id = t.next_record_id;
        t.next_record_id += 1;
        let row = GameRecord {
            id,
            player_id: record.player_id,
            game_type: record.game_type,
            score: record.score,
            level_reached: record.level_reached,
            time_spent: record.time_spent,
            dubbing: record.dubbing,
            completed_at,
        };
        t.records.push(row.clone());
        row
    }

    pub async fn records(&self) -> Vec<GameRecord> {
        self.tables.read().await.records.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    /// Aggregate score per player for `dimension`, in player-id order.
    fn aggregates(&self, dimension: RankingDimension, window: Option<TimeWindow>) -> Result<Vec<(PlayerId, i64)>, StoreError> {
        let mut acc: BTreeMap<PlayerId, i64> = BTreeMap::new();
        match dimension {
            RankingDimension::Overall => {
                return Ok(self.players.values().map(|p| (p.id, p.experience)).collect());
            }
            RankingDimension::Adventure | RankingDimension::Defense | RankingDimension::Dubbing => {
                let game_type = dimension.game_type();
                for r in self.records.iter().filter(|r| Some(r.game_type) == game_type) {
                    acc.entry(r.player_id)
                        .and_modify(|best| *best = (*best).max(r.score))
                        .or_insert(r.score);
                }
            }
            RankingDimension::Weekly | RankingDimension::Monthly => {
                let window = window.ok_or_else(|| {
                    StoreError::Backend(format!("{dimension} aggregate requires a time window"))
                })?;
                for r in self.records.iter().filter(|r| window.contains(r.completed_at)) {
                    let sum = acc.entry(r.player_id).or_insert(0);
                    *sum = sum.checked_add(r.score).ok_or_else(|| {
                        StoreError::Backend(format!("{dimension} aggregate overflow for player {}", r.player_id))
                    })?;
                }
            }
        }
        // Inner join with players: records of deleted players do not rank.
        Ok(acc.into_iter().filter(|(id, _)| self.players.contains_key(id)).collect())
    }
}

#[async_trait]
impl WordPool for MemoryStore {
    #[instrument(level = "debug", skip(self))]
    async fn random_words(
        &self,
        count: usize,
        difficulty: u32,
        category: Option<&str>,
    ) -> Result<Vec<PoolWord>, StoreError> {
        let t = self.tables.read().await;
        let candidates: Vec<&Word> = t
            .words
            .iter()
            .filter(|w| w.difficulty_level == difficulty)
            .filter(|w| category.map_or(true, |c| w.category == c))
            .collect();
        let mut rng = self.rng.lock().await;
        let picked: Vec<PoolWord> = candidates
            .choose_multiple(&mut *rng, count)
            .map(|w| PoolWord::from(*w))
            .collect();
        debug!(target: "store", available = candidates.len(), picked = picked.len(), "word draw");
        Ok(picked)
    }

    async fn word_story(&self, word_id: WordId) -> Result<Option<String>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.words
            .iter()
            .find(|w| w.id == word_id)
            .and_then(|w| w.story.clone())
            .filter(|s| !s.is_empty()))
    }

    async fn category_story(&self, category: &str) -> Result<Option<String>, StoreError> {
        let t = self.tables.read().await;
        let stories: Vec<&String> = t
            .words
            .iter()
            .filter(|w| w.category == category)
            .filter_map(|w| w.story.as_ref())
            .filter(|s| !s.is_empty())
            .collect();
        let mut rng = self.rng.lock().await;
        Ok(stories.choose(&mut *rng).map(|s| (*s).clone()))
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let t = self.tables.read().await;
        let set: BTreeSet<&String> = t.words.iter().map(|w| &w.category).filter(|c| !c.is_empty()).collect();
        Ok(set.into_iter().cloned().collect())
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn preferred_category(&self, player_id: PlayerId) -> Result<Option<String>, StoreError> {
        let t = self.tables.read().await;
        t.players
            .get(&player_id)
            .map(|p| p.preferred_category.clone().filter(|c| !c.is_empty()))
            .ok_or_else(|| StoreError::NotFound(format!("player {player_id}")))
    }

    #[instrument(level = "debug", skip(self))]
    async fn increment_experience_and_coins(
        &self,
        player_id: PlayerId,
        exp_delta: i64,
        coin_delta: i64,
    ) -> Result<(), StoreError> {
        // Read-modify-write happens entirely under the write guard.
        let mut t = self.tables.write().await;
        let p = t
            .players
            .get_mut(&player_id)
            .ok_or_else(|| StoreError::NotFound(format!("player {player_id}")))?;
        let experience = p.experience.checked_add(exp_delta);
        let coins = p.coins.checked_add(coin_delta);
        match (experience, coins) {
            (Some(experience), Some(coins)) => {
                p.experience = experience;
                p.coins = coins;
                Ok(())
            }
            _ => Err(StoreError::Backend(format!("reward counters overflow for player {player_id}"))),
        }
    }

    async fn username(&self, player_id: PlayerId) -> Result<String, StoreError> {
        let t = self.tables.read().await;
        t.players
            .get(&player_id)
            .map(|p| p.username.clone())
            .ok_or_else(|| StoreError::NotFound(format!("player {player_id}")))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append_game_record(&self, record: NewGameRecord) -> Result<GameRecord, StoreError> {
        Ok(self.insert_record_at(record, OffsetDateTime::now_utc()).await)
    }

    #[instrument(level = "debug", skip(self), fields(dimension = %query.dimension, limit = query.limit))]
    async fn query_aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, StoreError> {
        let t = self.tables.read().await;
        let mut scored = t.aggregates(query.dimension, query.window)?;
        // Stable: equal scores keep player-id order.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(scored
            .into_iter()
            .take(query.limit)
            .filter_map(|(id, score)| {
                t.players.get(&id).map(|p| AggregateRow {
                    player_id: p.id,
                    username: p.username.clone(),
                    score,
                    level: p.level,
                    experience: p.experience,
                })
            })
            .collect())
    }

    async fn player_aggregate(
        &self,
        dimension: RankingDimension,
        player_id: PlayerId,
        window: Option<TimeWindow>,
    ) -> Result<Option<i64>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.aggregates(dimension, window)?
            .into_iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, score)| score))
    }

    async fn game_history(
        &self,
        player_id: PlayerId,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<GameRecord>, StoreError> {
        let t = self.tables.read().await;
        let mut rows: Vec<GameRecord> = t
            .records
            .iter()
            .filter(|r| r.player_id == player_id)
            .filter(|r| game_type.map_or(true, |g| r.game_type == g))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
