//! Collaborator seams of the game core.
//!
//! The relational store and the ranked cache are external systems; the core
//! only talks to them through these traits. Every call goes through
//! [`with_timeout`] so a stalled backend surfaces as a retryable error instead
//! of holding a request open.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::{GameRecord, GameType, NewGameRecord, PlayerId, PoolWord, RankingDimension, WordId};
use crate::error::{CoreError, Dependency, StoreError};

pub mod memory;
pub mod ranked;
pub mod redis_cache;

pub use memory::MemoryStore;
pub use ranked::MemoryRankedSet;
pub use redis_cache::RedisRankedSet;

#[async_trait]
pub trait WordPool: Send + Sync {
    /// Up to `count` random words at `difficulty`, optionally restricted to `category`.
    async fn random_words(
        &self,
        count: usize,
        difficulty: u32,
        category: Option<&str>,
    ) -> Result<Vec<PoolWord>, StoreError>;

    async fn word_story(&self, word_id: WordId) -> Result<Option<String>, StoreError>;

    /// A random story among the words of `category`.
    async fn category_story(&self, category: &str) -> Result<Option<String>, StoreError>;

    async fn categories(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn preferred_category(&self, player_id: PlayerId) -> Result<Option<String>, StoreError>;

    /// Atomic, additive update of the reward counters.
    async fn increment_experience_and_coins(
        &self,
        player_id: PlayerId,
        exp_delta: i64,
        coin_delta: i64,
    ) -> Result<(), StoreError>;

    async fn username(&self, player_id: PlayerId) -> Result<String, StoreError>;
}

/// Half-open time range `[since, until)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: OffsetDateTime,
    pub until: OffsetDateTime,
}

impl TimeWindow {
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.since && at < self.until
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateQuery {
    pub dimension: RankingDimension,
    pub limit: usize,
    /// Required for weekly/monthly, ignored otherwise.
    pub window: Option<TimeWindow>,
}

/// One row of a leaderboard aggregate, in store order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateRow {
    pub player_id: PlayerId,
    pub username: String,
    pub score: i64,
    pub level: u32,
    pub experience: i64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn append_game_record(&self, record: NewGameRecord) -> Result<GameRecord, StoreError>;

    /// Rows ordered by aggregate score, highest first.
    async fn query_aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, StoreError>;

    /// The aggregate of a single player, `None` when they have no qualifying rows.
    async fn player_aggregate(
        &self,
        dimension: RankingDimension,
        player_id: PlayerId,
        window: Option<TimeWindow>,
    ) -> Result<Option<i64>, StoreError>;

    /// Newest first.
    async fn game_history(
        &self,
        player_id: PlayerId,
        game_type: Option<GameType>,
        limit: usize,
    ) -> Result<Vec<GameRecord>, StoreError>;
}

/// Sorted-set cache used for fast single-member rank lookups.
#[async_trait]
pub trait RankedCache: Send + Sync {
    /// Set (not add to) the member's score.
    async fn set_score(&self, key: &str, member: PlayerId, score: i64) -> Result<(), StoreError>;

    /// 0-based position counting from the highest score.
    async fn reverse_rank(&self, key: &str, member: PlayerId) -> Result<Option<u64>, StoreError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Drop one member. Absent members and keys are not an error.
    async fn remove(&self, key: &str, member: PlayerId) -> Result<(), StoreError>;

    /// Swap the whole set for `entries` and set its expiry. Empty `entries` deletes the key.
    async fn replace(&self, key: &str, entries: &[(PlayerId, i64)], ttl: Duration) -> Result<(), StoreError>;
}

/// Run a collaborator call under `limit`, lifting its error into `CoreError`.
pub async fn with_timeout<T, F>(dependency: Dependency, limit: Duration, call: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res.map_err(|e| CoreError::dependency(dependency, e)),
        Err(_) => Err(CoreError::timeout(dependency, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn slow_calls_become_retryable_failures() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(1)
        };
        let err = with_timeout(Dependency::WordPool, Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CoreError::DependencyFailure { dependency: Dependency::WordPool, .. }));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let ok = with_timeout(Dependency::RecordStore, Duration::from_secs(1), async { Ok::<_, StoreError>(3) }).await;
        assert_eq!(ok, Ok(3));
        let nf = with_timeout(Dependency::PlayerStore, Duration::from_secs(1), async {
            Err::<(), _>(StoreError::NotFound("player 4".into()))
        })
        .await;
        assert_eq!(nf, Err(CoreError::NotFound("player 4".into())));
    }

    #[test]
    fn window_is_half_open() {
        let w = TimeWindow {
            since: datetime!(2026-10-01 00:00 UTC),
            until: datetime!(2026-10-08 00:00 UTC),
        };
        assert!(w.contains(datetime!(2026-10-01 00:00 UTC)));
        assert!(w.contains(datetime!(2026-10-07 23:59 UTC)));
        assert!(!w.contains(datetime!(2026-10-08 00:00 UTC)));
        assert!(!w.contains(datetime!(2026-09-30 23:59 UTC)));
    }
}
