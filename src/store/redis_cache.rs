//! Redis-backed ranked sets (`ZADD` / `ZREVRANK` / `ZREM` / `EXPIRE`).
//!
//! `replace` fills a scratch key and `RENAME`s it over the live one inside a
//! `MULTI`, so readers never see a half-built set.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use tracing::info;

use super::RankedCache;
use crate::domain::PlayerId;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisRankedSet {
    conn: ConnectionManager,
}

impl RedisRankedSet {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Backend(format!("invalid REDIS_URL: {e}")))?;
        let conn = client.get_connection_manager().await.map_err(map_redis)?;
        info!(target: "linguaforge", "Redis ranked cache connected");
        Ok(Self { conn })
    }
}

fn map_redis(e: RedisError) -> StoreError {
    if e.is_timeout() || e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl RankedCache for RedisRankedSet {
    async fn set_score(&self, key: &str, member: PlayerId, score: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member.to_string(), score).await.map_err(map_redis)?;
        Ok(())
    }

    async fn reverse_rank(&self, key: &str, member: PlayerId) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn.clone();
        conn.zrevrank(key, member.to_string()).await.map_err(map_redis)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, ttl_secs(ttl)).await.map_err(map_redis)?;
        Ok(())
    }

    async fn remove(&self, key: &str, member: PlayerId) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zrem(key, member.to_string()).await.map_err(map_redis)?;
        Ok(())
    }

    async fn replace(&self, key: &str, entries: &[(PlayerId, i64)], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        if entries.is_empty() {
            let _: i64 = conn.del(key).await.map_err(map_redis)?;
            return Ok(());
        }
        let scratch = format!("{key}:rebuild");
        let items: Vec<(i64, String)> = entries.iter().map(|(m, s)| (*s, m.to_string())).collect();
        let _: () = redis::pipe()
            .atomic()
            .del(&scratch)
            .ignore()
            .zadd_multiple(&scratch, &items)
            .ignore()
            .expire(&scratch, ttl_secs(ttl))
            .ignore()
            .rename(&scratch, key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis)?;
        Ok(())
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}
