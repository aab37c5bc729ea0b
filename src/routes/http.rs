//! HTTP endpoint handlers. These are thin wrappers that forward to the game services.
//! Each handler is instrumented and logs its parameters and basic result info.
//!
//! Caller identity comes from the `X-Player-Id` header set by the authenticating
//! gateway in front of this service.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::{DubbingSubmission, GameType, PlayerId, RankingDimension, ScoreSubmission};
use crate::error::{CoreError, Dependency};
use crate::protocol::*;
use crate::state::AppState;

pub const PLAYER_HEADER: &str = "x-player-id";

/// Handler error: either no usable identity or a core failure.
#[derive(Debug)]
pub enum ApiError {
  Unauthorized,
  Core(CoreError),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self { ApiError::Core(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": "missing or invalid X-Player-Id header" })),
      )
        .into_response(),
      ApiError::Core(e) => e.into_response(),
    }
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn caller_id(headers: &HeaderMap) -> Result<PlayerId, ApiError> {
  headers
    .get(PLAYER_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<PlayerId>().ok())
    .filter(|id| *id > 0)
    .ok_or(ApiError::Unauthorized)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, headers, body), fields(game_type = %body.game_type, level = body.level))]
pub async fn http_start_game(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<StartGameIn>,
) -> Result<Response, ApiError> {
  let player_id = caller_id(&headers)?;
  let game_type: GameType = body.game_type.parse()?;
  let mut rng = StdRng::from_entropy();
  let session = state.generator.generate(game_type, player_id, body.level, &mut rng).await?;
  info!(target: "session", %player_id, %game_type, "HTTP session served");
  Ok(Json(session).into_response())
}

#[instrument(level = "info", skip(state, headers), fields(level = q.level))]
pub async fn http_start_adventure(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<LevelQuery>,
) -> Result<Response, ApiError> {
  let player_id = caller_id(&headers)?;
  let mut rng = StdRng::from_entropy();
  let session = state.generator.adventure(player_id, q.level, &mut rng).await?;
  Ok(Json(session).into_response())
}

#[instrument(level = "info", skip(state, headers, body), fields(game_type = %body.game_type, score = body.score))]
pub async fn http_submit_score(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<SubmitScoreIn>,
) -> ApiResult<RecordOut> {
  let player_id = caller_id(&headers)?;
  let submission = ScoreSubmission {
    game_type: body.game_type.parse()?,
    score: body.score,
    level_reached: body.level_reached,
    time_spent: body.time_spent,
  };
  let record = state.recorder.submit_score(player_id, submission).await?;
  Ok(Json(RecordOut { message: "Score submitted successfully", record }))
}

#[instrument(level = "info", skip(state, headers, body), fields(score = body.score))]
pub async fn http_submit_defense(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<DefenseSubmitIn>,
) -> ApiResult<RecordOut> {
  let player_id = caller_id(&headers)?;
  let submission = ScoreSubmission {
    game_type: GameType::Defense,
    score: body.score,
    level_reached: body.level_reached,
    time_spent: body.time_spent,
  };
  let record = state.recorder.submit_score(player_id, submission).await?;
  Ok(Json(RecordOut { message: "Defense score submitted successfully", record }))
}

#[instrument(level = "info", skip(state, headers, body), fields(scene_id = body.scene_id, script_id = body.script_id, audio_len = body.audio_data.len()))]
pub async fn http_upload_dubbing(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<DubbingSubmission>,
) -> ApiResult<RecordOut> {
  let player_id = caller_id(&headers)?;
  let record = state.recorder.submit_dubbing(player_id, body).await?;
  Ok(Json(RecordOut { message: "Audio uploaded successfully", record }))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_history(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<HistoryQuery>,
) -> ApiResult<HistoryOut> {
  let player_id = caller_id(&headers)?;
  let game_type = match q.game_type.as_deref().map(str::trim) {
    None | Some("") => None,
    Some(s) => Some(s.parse::<GameType>()?),
  };
  let records = state.recorder.history(player_id, game_type, q.limit).await?;
  Ok(Json(HistoryOut { total: records.len(), records }))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_leaderboard(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<LeaderboardQuery>,
) -> Result<Response, ApiError> {
  caller_id(&headers)?;
  leaderboard_page(&state, q).await
}

#[instrument(level = "info", skip(state))]
pub async fn http_public_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
) -> Result<Response, ApiError> {
  leaderboard_page(&state, q).await
}

async fn leaderboard_page(state: &AppState, q: LeaderboardQuery) -> Result<Response, ApiError> {
  let dimension = RankingDimension::parse_or_default(q.dimension.as_deref())?;
  let page = state.leaderboard.get_leaderboard(dimension, q.limit).await?;
  Ok(Json(page).into_response())
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_user_rank(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<RankQuery>,
) -> ApiResult<RankOut> {
  let player_id = caller_id(&headers)?;
  let dimension = RankingDimension::parse_or_default(q.dimension.as_deref())?;
  let rank = state.leaderboard.get_user_rank(player_id, dimension).await;
  info!(target: "leaderboard", %player_id, %dimension, rank = ?rank.position(), "HTTP rank served");
  Ok(Json(RankOut { player_id, rank: rank.position(), dimension }))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_top_players(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<LimitQuery>,
) -> Result<Response, ApiError> {
  caller_id(&headers)?;
  Ok(Json(state.leaderboard.top_players(q.limit).await?).into_response())
}

#[instrument(level = "info", skip(state))]
pub async fn http_public_top_players(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LimitQuery>,
) -> Result<Response, ApiError> {
  Ok(Json(state.leaderboard.top_players(q.limit).await?).into_response())
}

#[instrument(level = "info", skip(state))]
pub async fn http_categories(State(state): State<Arc<AppState>>) -> ApiResult<CategoriesOut> {
  let categories = crate::store::with_timeout(Dependency::WordPool, state.config.store_timeout, state.words.categories()).await?;
  Ok(Json(CategoriesOut { categories }))
}
