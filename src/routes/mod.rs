//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - game, history and leaderboard API under `/api/v1/...`
/// - unauthenticated leaderboard reads under `/api/v1/public/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Games
        .route("/api/v1/games/start", post(http::http_start_game))
        .route("/api/v1/games/adventure/start", get(http::http_start_adventure))
        .route("/api/v1/games/submit", post(http::http_submit_score))
        .route("/api/v1/games/defense/submit", post(http::http_submit_defense))
        .route("/api/v1/games/dubbing/upload", post(http::http_upload_dubbing))
        .route("/api/v1/games/history", get(http::http_history))
        // Leaderboards
        .route("/api/v1/leaderboard", get(http::http_leaderboard))
        .route("/api/v1/leaderboard/rank", get(http::http_user_rank))
        .route("/api/v1/leaderboard/top", get(http::http_top_players))
        .route("/api/v1/public/leaderboard", get(http::http_public_leaderboard))
        .route("/api/v1/public/leaderboard/top", get(http::http_public_top_players))
        // Words
        .route("/api/v1/words/categories", get(http::http_categories))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
