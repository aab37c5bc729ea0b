//! In-process sorted sets with per-key expiry, used when no Redis is configured.
//!
//! Ordering matches `ZREVRANK`: score descending, equal scores by member descending.
//! Members live in a treap whose nodes carry subtree sizes, so insert, remove
//! and reverse rank are all O(log n) expected.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RankedCache;
use crate::domain::PlayerId;
use crate::error::StoreError;

type Key = (Reverse<i64>, Reverse<PlayerId>);
type Link = Option<Box<Node>>;

struct Node {
    key: Key,
    priority: u64,
    size: usize,
    left: Link,
    right: Link,
}

impl Node {
    fn new(key: Key) -> Box<Self> {
        Box::new(Node { key, priority: rand::random(), size: 1, left: None, right: None })
    }

    fn update(&mut self) {
        self.size = 1 + size(&self.left) + size(&self.right);
    }
}

fn size(link: &Link) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

/// Keys `< key` to the left, the rest to the right.
fn split(link: Link, key: &Key) -> (Link, Link) {
    match link {
        None => (None, None),
        Some(mut n) => {
            if n.key < *key {
                let (l, r) = split(n.right.take(), key);
                n.right = l;
                n.update();
                (Some(n), r)
            } else {
                let (l, r) = split(n.left.take(), key);
                n.left = r;
                n.update();
                (l, Some(n))
            }
        }
    }
}

/// Every key of `a` must sort before every key of `b`.
fn merge(a: Link, b: Link) -> Link {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(mut a), Some(mut b)) => {
            if a.priority > b.priority {
                a.right = merge(a.right.take(), Some(b));
                a.update();
                Some(a)
            } else {
                b.left = merge(Some(a), b.left.take());
                b.update();
                Some(b)
            }
        }
    }
}

fn remove_key(link: Link, key: &Key) -> Link {
    let mut n = link?;
    if n.key == *key {
        return merge(n.left.take(), n.right.take());
    }
    if *key < n.key {
        n.left = remove_key(n.left.take(), key);
    } else {
        n.right = remove_key(n.right.take(), key);
    }
    n.update();
    Some(n)
}

#[derive(Default)]
struct SortedSet {
    scores: HashMap<PlayerId, i64>,
    root: Link,
    expires_at: Option<Instant>,
}

impl SortedSet {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn set(&mut self, member: PlayerId, score: i64) {
        if let Some(old) = self.scores.insert(member, score) {
            self.root = remove_key(self.root.take(), &(Reverse(old), Reverse(member)));
        }
        let key = (Reverse(score), Reverse(member));
        let (l, r) = split(self.root.take(), &key);
        self.root = merge(merge(l, Some(Node::new(key))), r);
    }

    fn remove(&mut self, member: PlayerId) {
        if let Some(old) = self.scores.remove(&member) {
            self.root = remove_key(self.root.take(), &(Reverse(old), Reverse(member)));
        }
    }

    /// Number of members ordered ahead of `member`.
    fn reverse_rank(&self, member: PlayerId) -> Option<u64> {
        let key = (Reverse(*self.scores.get(&member)?), Reverse(member));
        let mut ahead = 0;
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            if key <= n.key {
                cur = n.left.as_deref();
            } else {
                ahead += size(&n.left) + 1;
                cur = n.right.as_deref();
            }
        }
        Some(ahead as u64)
    }
}

#[derive(Default)]
pub struct MemoryRankedSet {
    sets: RwLock<HashMap<String, SortedSet>>,
}

impl MemoryRankedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, key: &str) -> usize {
        let sets = self.sets.read().await;
        sets.get(key)
            .filter(|s| !s.expired(Instant::now()))
            .map_or(0, |s| s.scores.len())
    }
}

#[async_trait]
impl RankedCache for MemoryRankedSet {
    async fn set_score(&self, key: &str, member: PlayerId, score: i64) -> Result<(), StoreError> {
        let mut sets = self.sets.write().await;
        let now = Instant::now();
        if sets.get(key).is_some_and(|s| s.expired(now)) {
            sets.remove(key);
        }
        sets.entry(key.to_string()).or_default().set(member, score);
        Ok(())
    }

    async fn reverse_rank(&self, key: &str, member: PlayerId) -> Result<Option<u64>, StoreError> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(key)
            .filter(|s| !s.expired(Instant::now()))
            .and_then(|s| s.reverse_rank(member)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut sets = self.sets.write().await;
        if let Some(s) = sets.get_mut(key) {
            s.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn remove(&self, key: &str, member: PlayerId) -> Result<(), StoreError> {
        let mut sets = self.sets.write().await;
        if let Some(s) = sets.get_mut(key) {
            s.remove(member);
            if s.scores.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    async fn replace(&self, key: &str, entries: &[(PlayerId, i64)], ttl: Duration) -> Result<(), StoreError> {
        let mut fresh = SortedSet::default();
        for &(member, score) in entries {
            fresh.set(member, score);
        }
        fresh.expires_at = Some(Instant::now() + ttl);

        let mut sets = self.sets.write().await;
        if entries.is_empty() {
            sets.remove(key);
        } else {
            sets.insert(key.to_string(), fresh);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn ranks_highest_first() {
        let set = MemoryRankedSet::new();
        set.set_score("lb", 1, 50).await.unwrap();
        set.set_score("lb", 2, 90).await.unwrap();
        set.set_score("lb", 3, 70).await.unwrap();

        assert_eq!(set.reverse_rank("lb", 2).await.unwrap(), Some(0));
        assert_eq!(set.reverse_rank("lb", 3).await.unwrap(), Some(1));
        assert_eq!(set.reverse_rank("lb", 1).await.unwrap(), Some(2));
        assert_eq!(set.reverse_rank("lb", 4).await.unwrap(), None);
        assert_eq!(set.reverse_rank("other", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_score_overwrites() {
        let set = MemoryRankedSet::new();
        set.set_score("lb", 1, 50).await.unwrap();
        set.set_score("lb", 2, 60).await.unwrap();
        set.set_score("lb", 1, 10).await.unwrap();
        set.set_score("lb", 1, 100).await.unwrap();

        assert_eq!(set.len("lb").await, 2);
        assert_eq!(set.reverse_rank("lb", 1).await.unwrap(), Some(0));
        assert_eq!(set.reverse_rank("lb", 2).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn equal_scores_order_by_member_descending() {
        let set = MemoryRankedSet::new();
        set.set_score("lb", 3, 10).await.unwrap();
        set.set_score("lb", 7, 10).await.unwrap();
        assert_eq!(set.reverse_rank("lb", 7).await.unwrap(), Some(0));
        assert_eq!(set.reverse_rank("lb", 3).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn expired_keys_read_as_absent() {
        let set = MemoryRankedSet::new();
        set.set_score("lb", 1, 10).await.unwrap();
        set.expire("lb", Duration::ZERO).await.unwrap();
        assert_eq!(set.reverse_rank("lb", 1).await.unwrap(), None);

        set.set_score("lb", 2, 5).await.unwrap();
        assert_eq!(set.len("lb").await, 1);
        assert_eq!(set.reverse_rank("lb", 2).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn remove_and_replace() {
        let set = MemoryRankedSet::new();
        for (m, s) in [(1, 30), (2, 20), (3, 10)] {
            set.set_score("lb", m, s).await.unwrap();
        }
        set.remove("lb", 1).await.unwrap();
        set.remove("lb", 9).await.unwrap();
        assert_eq!(set.reverse_rank("lb", 1).await.unwrap(), None);
        assert_eq!(set.reverse_rank("lb", 2).await.unwrap(), Some(0));

        set.replace("lb", &[(5, 1), (6, 2)], Duration::from_secs(60)).await.unwrap();
        assert_eq!(set.len("lb").await, 2);
        assert_eq!(set.reverse_rank("lb", 2).await.unwrap(), None);
        assert_eq!(set.reverse_rank("lb", 6).await.unwrap(), Some(0));

        set.replace("lb", &[], Duration::from_secs(60)).await.unwrap();
        assert_eq!(set.len("lb").await, 0);
    }

    proptest! {
        #[test]
        fn prop_rank_matches_sorted_order(ops in proptest::collection::vec((0i64..40, -50i64..50, any::<bool>()), 1..200)) {
            let mut set = SortedSet::default();
            let mut model: HashMap<PlayerId, i64> = HashMap::new();
            for (member, score, keep) in ops {
                if keep {
                    set.set(member, score);
                    model.insert(member, score);
                } else {
                    set.remove(member);
                    model.remove(&member);
                }
            }
            let mut expected: Vec<(PlayerId, i64)> = model.iter().map(|(m, s)| (*m, *s)).collect();
            expected.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

            prop_assert_eq!(size(&set.root), expected.len());
            for (idx, (member, _)) in expected.iter().enumerate() {
                prop_assert_eq!(set.reverse_rank(*member), Some(idx as u64));
            }
        }
    }
}
