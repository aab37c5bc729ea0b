//! Vocabulary game core: session generation, score recording and leaderboards,
//! with in-process and Redis-backed collaborators and an axum HTTP surface.

pub mod config;
pub mod domain;
pub mod error;
pub mod leaderboard;
pub mod protocol;
pub mod routes;
pub mod scoring;
pub mod seeds;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
