//! Leaderboards over several ranking dimensions.
//!
//! Two read paths:
//!   - `get_leaderboard` always recomputes from the durable aggregate (authoritative).
//!   - `get_user_rank` reads only the per-dimension ranked set in the cache.
//!
//! The ranked sets are kept in step by `refresh_standing`, which the score
//! recorder calls after every successful submission, and can be rebuilt from
//! the durable store with `rebuild`. Cache trouble never fails a request: rank
//! lookups degrade to `Unranked` and refreshes are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::config::LeaderboardSettings;
use crate::domain::{GameType, LeaderboardEntry, LeaderboardPage, PlayerId, RankingDimension, UserRank};
use crate::error::{CoreError, Dependency};
use crate::store::{with_timeout, AggregateQuery, RankedCache, RecordStore, TimeWindow};

/// Cache key of a dimension's ranked set.
pub fn ranked_set_key(dimension: RankingDimension) -> String {
  format!("leaderboard:{}", dimension.as_str())
}

/// Window for weekly/monthly dimensions ending (exclusive) at `now`.
pub fn window_for(dimension: RankingDimension, now: OffsetDateTime) -> Option<TimeWindow> {
  match dimension {
    RankingDimension::Weekly => Some(TimeWindow { since: now - time::Duration::days(7), until: now }),
    RankingDimension::Monthly => Some(TimeWindow { since: one_month_before(now), until: now }),
    _ => None,
  }
}

/// Same wall-clock time one calendar month earlier, day clamped to the month's length.
fn one_month_before(now: OffsetDateTime) -> OffsetDateTime {
  let month = now.month().previous();
  let year = if month == time::Month::December { now.year() - 1 } else { now.year() };
  let day = now.day().min(month.length(year));
  time::Date::from_calendar_date(year, month, day)
    .map(|d| now.replace_date(d))
    .unwrap_or(now - time::Duration::days(30))
}

pub struct Leaderboard {
  records: Arc<dyn RecordStore>,
  cache: Arc<dyn RankedCache>,
  settings: LeaderboardSettings,
  timeout: Duration,
}

impl Leaderboard {
  pub fn new(
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn RankedCache>,
    settings: LeaderboardSettings,
    timeout: Duration,
  ) -> Self {
    Self { records, cache, settings, timeout }
  }

  /// `limit <= 0` takes the default; anything above the maximum is clamped.
  pub fn normalize_limit(&self, limit: i64) -> usize {
    if limit <= 0 {
      self.settings.default_limit
    } else {
      usize::try_from(limit).unwrap_or(usize::MAX).min(self.settings.max_limit)
    }
  }

  #[instrument(level = "info", skip(self), fields(%dimension))]
  pub async fn get_leaderboard(&self, dimension: RankingDimension, limit: i64) -> Result<LeaderboardPage, CoreError> {
    let now = OffsetDateTime::now_utc();
    let query = AggregateQuery {
      dimension,
      limit: self.normalize_limit(limit),
      window: window_for(dimension, now),
    };
    let rows = with_timeout(Dependency::RecordStore, self.timeout, self.records.query_aggregate(&query)).await?;

    let entries: Vec<LeaderboardEntry> = rows
      .into_iter()
      .take(query.limit)
      .enumerate()
      .map(|(idx, r)| LeaderboardEntry {
        player_id: r.player_id,
        username: r.username,
        score: r.score,
        level: r.level,
        experience: r.experience,
        rank: idx as u32 + 1,
      })
      .collect();

    info!(target: "leaderboard", %dimension, limit = query.limit, entries = entries.len(), "leaderboard computed");
    Ok(LeaderboardPage { dimension, total: entries.len(), entries, updated_at: now })
  }

  pub async fn top_players(&self, limit: i64) -> Result<LeaderboardPage, CoreError> {
    self.get_leaderboard(RankingDimension::Overall, limit).await
  }

  /// 1-based position in the dimension's ranked set.
  #[instrument(level = "info", skip(self), fields(%player_id, %dimension))]
  pub async fn get_user_rank(&self, player_id: PlayerId, dimension: RankingDimension) -> UserRank {
    let key = ranked_set_key(dimension);
    match with_timeout(Dependency::RankedCache, self.timeout, self.cache.reverse_rank(&key, player_id)).await {
      Ok(Some(r)) => UserRank::Ranked(r + 1),
      Ok(None) => UserRank::Unranked,
      Err(e) => {
        warn!(target: "leaderboard", %player_id, %dimension, error = %e, "ranked cache unavailable; reporting unranked");
        UserRank::Unranked
      }
    }
  }

  /// Set the player's score in the dimension's ranked set and renew its expiry.
  #[instrument(level = "debug", skip(self), fields(%player_id, %dimension))]
  pub async fn record_score(&self, player_id: PlayerId, score: i64, dimension: RankingDimension) -> Result<(), CoreError> {
    let key = ranked_set_key(dimension);
    with_timeout(Dependency::RankedCache, self.timeout, self.cache.set_score(&key, player_id, score)).await?;
    with_timeout(Dependency::RankedCache, self.timeout, self.cache.expire(&key, self.settings.ranked_set_ttl())).await
  }

  /// Drop the player from the dimension's ranked set.
  pub async fn remove_member(&self, player_id: PlayerId, dimension: RankingDimension) -> Result<(), CoreError> {
    let key = ranked_set_key(dimension);
    with_timeout(Dependency::RankedCache, self.timeout, self.cache.remove(&key, player_id)).await
  }

  /// Push the player's authoritative aggregates into every dimension a
  /// `game_type` submission can move. A player with no qualifying rows (e.g.
  /// everything aged out of the weekly window) is removed. Best effort.
  #[instrument(level = "debug", skip(self), fields(%player_id, %game_type))]
  pub async fn refresh_standing(&self, player_id: PlayerId, game_type: GameType) {
    let now = OffsetDateTime::now_utc();
    let dimensions = [
      RankingDimension::Overall,
      RankingDimension::from(game_type),
      RankingDimension::Weekly,
      RankingDimension::Monthly,
    ];
    for dimension in dimensions {
      if let Err(e) = self.sync_member(player_id, dimension, window_for(dimension, now)).await {
        warn!(target: "leaderboard", %player_id, %dimension, error = %e, "ranked set refresh failed");
      }
    }
  }

  /// Read-then-write is not atomic: a concurrent submission by the same player
  /// can land its older read last. Re-reading after the write and rewriting on
  /// change makes the newest aggregate win in that case.
  async fn sync_member(
    &self,
    player_id: PlayerId,
    dimension: RankingDimension,
    window: Option<TimeWindow>,
  ) -> Result<(), CoreError> {
    let mut current = self.player_aggregate(player_id, dimension, window).await?;
    for _ in 0..2 {
      match current {
        Some(score) => self.record_score(player_id, score, dimension).await?,
        None => self.remove_member(player_id, dimension).await?,
      }
      let latest = self.player_aggregate(player_id, dimension, window).await?;
      if latest == current {
        break;
      }
      current = latest;
    }
    Ok(())
  }

  async fn player_aggregate(
    &self,
    player_id: PlayerId,
    dimension: RankingDimension,
    window: Option<TimeWindow>,
  ) -> Result<Option<i64>, CoreError> {
    with_timeout(
      Dependency::RecordStore,
      self.timeout,
      self.records.player_aggregate(dimension, player_id, window),
    )
    .await
  }

  /// Replace a dimension's ranked set with the durable aggregate; members that
  /// no longer qualify are dropped.
  #[instrument(level = "info", skip(self), fields(%dimension))]
  pub async fn rebuild(&self, dimension: RankingDimension) -> Result<usize, CoreError> {
    let query = AggregateQuery {
      dimension,
      limit: usize::MAX,
      window: window_for(dimension, OffsetDateTime::now_utc()),
    };
    let rows = with_timeout(Dependency::RecordStore, self.timeout, self.records.query_aggregate(&query)).await?;
    let entries: Vec<(PlayerId, i64)> = rows.iter().map(|r| (r.player_id, r.score)).collect();
    let key = ranked_set_key(dimension);
    with_timeout(
      Dependency::RankedCache,
      self.timeout,
      self.cache.replace(&key, &entries, self.settings.ranked_set_ttl()),
    )
    .await?;
    debug!(target: "leaderboard", %dimension, members = entries.len(), "ranked set rebuilt");
    Ok(entries.len())
  }

  /// Rebuild every dimension, logging (not failing on) individual errors.
  pub async fn rebuild_all(&self) {
    for dimension in RankingDimension::ALL {
      if let Err(e) = self.rebuild(dimension).await {
        warn!(target: "leaderboard", %dimension, error = %e, "ranked set rebuild failed");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{NewGameRecord, Player};
  use crate::error::StoreError;
  use crate::store::{MemoryRankedSet, MemoryStore};
  use async_trait::async_trait;
  use time::macros::datetime;

  struct DownCache;

  #[async_trait]
  impl RankedCache for DownCache {
    async fn set_score(&self, _: &str, _: PlayerId, _: i64) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn reverse_rank(&self, _: &str, _: PlayerId) -> Result<Option<u64>, StoreError> {
      Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn expire(&self, _: &str, _: Duration) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn remove(&self, _: &str, _: PlayerId) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn replace(&self, _: &str, _: &[(PlayerId, i64)], _: Duration) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("connection refused".into()))
    }
  }

  async fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, name, xp) in [(1, "alice", 10), (2, "bob", 300), (3, "chen", 120), (4, "dana", 120)] {
      store
        .insert_player(Player { id, username: name.into(), level: 1, experience: xp, coins: 0, preferred_category: None })
        .await;
    }
    store
  }

  fn board(store: Arc<MemoryStore>, cache: Arc<dyn RankedCache>) -> Leaderboard {
    Leaderboard::new(store, cache, LeaderboardSettings::default(), Duration::from_secs(1))
  }

  fn rec(player_id: PlayerId, game_type: GameType, score: i64) -> NewGameRecord {
    NewGameRecord { player_id, game_type, score, level_reached: 1, time_spent: 10, dubbing: None }
  }

  #[test]
  fn monthly_window_clamps_day() {
    let w = window_for(RankingDimension::Monthly, datetime!(2026-03-31 12:00 UTC)).unwrap();
    assert_eq!(w.since, datetime!(2026-02-28 12:00 UTC));
    let w = window_for(RankingDimension::Monthly, datetime!(2026-01-15 08:30 UTC)).unwrap();
    assert_eq!(w.since, datetime!(2025-12-15 08:30 UTC));
    let w = window_for(RankingDimension::Weekly, datetime!(2026-10-18 00:00 UTC)).unwrap();
    assert_eq!(w.since, datetime!(2026-10-11 00:00 UTC));
    assert!(window_for(RankingDimension::Overall, datetime!(2026-10-18 00:00 UTC)).is_none());
  }

  #[tokio::test]
  async fn overall_is_ordered_with_dense_ranks() {
    let lb = board(store().await, Arc::new(MemoryRankedSet::new()));
    let page = lb.get_leaderboard(RankingDimension::Overall, 3).await.unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.entries.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(page.entries.windows(2).all(|w| w[0].score >= w[1].score));
    // equal experience keeps store order
    assert_eq!(page.entries.iter().map(|e| e.player_id).collect::<Vec<_>>(), vec![2, 3, 4]);
  }

  #[tokio::test]
  async fn limits_are_normalized() {
    let lb = board(store().await, Arc::new(MemoryRankedSet::new()));
    assert_eq!(lb.normalize_limit(0), 10);
    assert_eq!(lb.normalize_limit(-4), 10);
    assert_eq!(lb.normalize_limit(5000), 100);
    assert_eq!(lb.get_leaderboard(RankingDimension::Overall, 0).await.unwrap().total, 4);
  }

  #[tokio::test]
  async fn game_dimension_uses_best_score() {
    let s = store().await;
    s.append_game_record(rec(1, GameType::Defense, 80)).await.unwrap();
    s.append_game_record(rec(1, GameType::Defense, 20)).await.unwrap();
    s.append_game_record(rec(3, GameType::Defense, 50)).await.unwrap();
    s.append_game_record(rec(2, GameType::Adventure, 999)).await.unwrap();
    let lb = board(s, Arc::new(MemoryRankedSet::new()));

    let page = lb.get_leaderboard(RankingDimension::Defense, 10).await.unwrap();
    assert_eq!(
      page.entries.iter().map(|e| (e.player_id, e.score, e.rank)).collect::<Vec<_>>(),
      vec![(1, 80, 1), (3, 50, 2)]
    );
  }

  #[tokio::test]
  async fn weekly_only_counts_recent_records() {
    let s = store().await;
    let now = OffsetDateTime::now_utc();
    s.insert_record_at(rec(1, GameType::Adventure, 40), now - time::Duration::days(2)).await;
    s.insert_record_at(rec(1, GameType::Defense, 15), now - time::Duration::days(3)).await;
    s.insert_record_at(rec(3, GameType::Adventure, 500), now - time::Duration::days(9)).await;
    let lb = board(s, Arc::new(MemoryRankedSet::new()));

    let weekly = lb.get_leaderboard(RankingDimension::Weekly, 10).await.unwrap();
    assert_eq!(weekly.entries.iter().map(|e| (e.player_id, e.score)).collect::<Vec<_>>(), vec![(1, 55)]);
    let monthly = lb.get_leaderboard(RankingDimension::Monthly, 10).await.unwrap();
    assert_eq!(monthly.entries.iter().map(|e| (e.player_id, e.score)).collect::<Vec<_>>(), vec![(3, 500), (1, 55)]);
  }

  #[tokio::test]
  async fn rank_comes_from_ranked_set() {
    let lb = board(store().await, Arc::new(MemoryRankedSet::new()));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Adventure).await, UserRank::Unranked);

    lb.record_score(1, 70, RankingDimension::Adventure).await.unwrap();
    lb.record_score(2, 90, RankingDimension::Adventure).await.unwrap();
    assert_eq!(lb.get_user_rank(2, RankingDimension::Adventure).await, UserRank::Ranked(1));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Adventure).await, UserRank::Ranked(2));

    lb.record_score(1, 95, RankingDimension::Adventure).await.unwrap();
    assert_eq!(lb.get_user_rank(1, RankingDimension::Adventure).await, UserRank::Ranked(1));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Defense).await, UserRank::Unranked);
  }

  #[tokio::test]
  async fn rebuild_mirrors_durable_order() {
    let lb = board(store().await, Arc::new(MemoryRankedSet::new()));
    assert_eq!(lb.rebuild(RankingDimension::Overall).await.unwrap(), 4);
    assert_eq!(lb.get_user_rank(2, RankingDimension::Overall).await, UserRank::Ranked(1));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Overall).await, UserRank::Ranked(4));
  }

  #[tokio::test]
  async fn aged_out_members_leave_the_weekly_set() {
    let s = store().await;
    let now = OffsetDateTime::now_utc();
    s.insert_record_at(rec(1, GameType::Adventure, 500), now - time::Duration::days(9)).await;
    s.insert_record_at(rec(2, GameType::Adventure, 50), now).await;
    let lb = board(s, Arc::new(MemoryRankedSet::new()));

    // standing pushed while the old record was still inside the window
    lb.record_score(1, 500, RankingDimension::Weekly).await.unwrap();
    lb.refresh_standing(2, GameType::Adventure).await;
    assert_eq!(lb.get_user_rank(2, RankingDimension::Weekly).await, UserRank::Ranked(2));

    lb.rebuild(RankingDimension::Weekly).await.unwrap();
    let page = lb.get_leaderboard(RankingDimension::Weekly, 10).await.unwrap();
    assert_eq!(page.entries.iter().map(|e| (e.player_id, e.score, e.rank)).collect::<Vec<_>>(), vec![(2, 50, 1)]);
    assert_eq!(lb.get_user_rank(2, RankingDimension::Weekly).await, UserRank::Ranked(1));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Weekly).await, UserRank::Unranked);
    // monthly still counts the 9-day-old record
    lb.rebuild(RankingDimension::Monthly).await.unwrap();
    assert_eq!(lb.get_user_rank(1, RankingDimension::Monthly).await, UserRank::Ranked(1));
  }

  #[tokio::test]
  async fn refresh_removes_player_without_window_rows() {
    let s = store().await;
    let now = OffsetDateTime::now_utc();
    s.insert_record_at(rec(3, GameType::Defense, 70), now - time::Duration::days(8)).await;
    let lb = board(s, Arc::new(MemoryRankedSet::new()));

    lb.record_score(3, 70, RankingDimension::Weekly).await.unwrap();
    lb.refresh_standing(3, GameType::Defense).await;
    assert_eq!(lb.get_user_rank(3, RankingDimension::Weekly).await, UserRank::Unranked);
    assert_eq!(lb.get_user_rank(3, RankingDimension::Monthly).await, UserRank::Ranked(1));
    assert_eq!(lb.get_user_rank(3, RankingDimension::Defense).await, UserRank::Ranked(1));
  }

  #[tokio::test]
  async fn rebuild_of_empty_dimension_clears_it() {
    let lb = board(store().await, Arc::new(MemoryRankedSet::new()));
    lb.record_score(4, 10, RankingDimension::Dubbing).await.unwrap();
    assert_eq!(lb.rebuild(RankingDimension::Dubbing).await.unwrap(), 0);
    assert_eq!(lb.get_user_rank(4, RankingDimension::Dubbing).await, UserRank::Unranked);
  }

  #[tokio::test]
  async fn cache_outage_degrades_instead_of_failing() {
    let lb = board(store().await, Arc::new(DownCache));
    assert_eq!(lb.get_user_rank(1, RankingDimension::Overall).await, UserRank::Unranked);
    // durable path is unaffected
    assert_eq!(lb.get_leaderboard(RankingDimension::Overall, 2).await.unwrap().total, 2);
    lb.refresh_standing(1, GameType::Adventure).await;
    assert!(matches!(
      lb.record_score(1, 5, RankingDimension::Overall).await,
      Err(CoreError::DependencyFailure { dependency: Dependency::RankedCache, .. })
    ));
  }
}
