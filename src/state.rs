//! Application state: collaborators, the three game services and config.
//!
//! This module owns:
//!   - the relational store (in-process, seeded from built-ins plus the TOML game file)
//!   - the ranked cache (Redis when REDIS_URL is set and reachable, else in-process)
//!   - the session generator, score recorder and leaderboard ranker
//!
//! On startup every ranked set is rebuilt from the durable aggregates.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::leaderboard::Leaderboard;
use crate::scoring::ScoreRecorder;
use crate::seeds::{seed_players, seed_scenes, seed_words};
use crate::session::{SceneCatalog, SessionGenerator};
use crate::store::{MemoryRankedSet, MemoryStore, RankedCache, RedisRankedSet, WordPool};

pub struct AppState {
    pub config: AppConfig,
    pub words: Arc<dyn WordPool>,
    pub generator: SessionGenerator,
    pub recorder: ScoreRecorder,
    pub leaderboard: Arc<Leaderboard>,
}

impl AppState {
    /// Build state from config: seed the store, pick a ranked cache, warm the ranked sets.
    #[instrument(level = "info", skip_all)]
    pub async fn new(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed_store(&store, &config).await;

        let cache: Arc<dyn RankedCache> = match config.redis_url.as_deref() {
            Some(url) => match RedisRankedSet::connect(url).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    warn!(target: "linguaforge", error = %e, "Redis unavailable; using in-process ranked sets");
                    Arc::new(MemoryRankedSet::new())
                }
            },
            None => {
                info!(target: "linguaforge", "REDIS_URL not set; using in-process ranked sets");
                Arc::new(MemoryRankedSet::new())
            }
        };

        let state = Self::from_parts(config, store, cache);
        state.leaderboard.rebuild_all().await;
        state
    }

    /// Wire the services over an existing store and cache.
    pub fn from_parts(config: AppConfig, store: Arc<MemoryStore>, cache: Arc<dyn RankedCache>) -> Self {
        let mut scenes = seed_scenes();
        for scene in &config.scenes {
            scenes.retain(|s| s.id != scene.id);
            scenes.push(scene.clone());
        }
        let scenes = Arc::new(SceneCatalog::new(scenes));

        let leaderboard = Arc::new(Leaderboard::new(
            store.clone(),
            cache,
            config.leaderboard.clone(),
            config.store_timeout,
        ));
        let generator = SessionGenerator::new(
            store.clone(),
            store.clone(),
            scenes.clone(),
            config.game.clone(),
            config.store_timeout,
        );
        let recorder = ScoreRecorder::new(
            store.clone(),
            store.clone(),
            leaderboard.clone(),
            scenes.clone(),
            config.game.max_score,
            config.store_timeout,
        );
        info!(target: "linguaforge", scenes = scenes.len(), "Game services ready");

        Self { config, words: store, generator, recorder, leaderboard }
    }
}

/// Built-in words and players first, then config words (same id replaces).
pub async fn seed_store(store: &MemoryStore, config: &AppConfig) {
    for w in seed_words().into_iter().chain(config.words.iter().cloned()) {
        store.insert_word(w).await;
    }
    for p in seed_players() {
        store.insert_player(p).await;
    }
    info!(target: "linguaforge", config_words = config.words.len(), "Store seeded");
}
