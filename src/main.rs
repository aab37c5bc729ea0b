//! LinguaForge · vocabulary game backend
//!
//! - Axum HTTP API: session generation, score submission, leaderboards
//! - Ranked sets in Redis when REDIS_URL is set, in-process otherwise
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 8080)
//!   REDIS_URL         : ranked cache connection string
//!   STORE_TIMEOUT_MS  : per collaborator call (default 2000)
//!   GAME_CONFIG_PATH  : path to TOML game file (tuning, scenes, extra words)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use linguaforge::config::AppConfig;
use linguaforge::routes::build_router;
use linguaforge::state::AppState;
use linguaforge::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::load();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  // Seeded store, ranked cache and the game services.
  let state = Arc::new(AppState::new(config).await);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "linguaforge", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "linguaforge", "shutdown signal received");
    })
    .await?;
  Ok(())
}
