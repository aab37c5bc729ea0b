use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use linguaforge::config::AppConfig;
use linguaforge::routes::build_router;
use linguaforge::state::{seed_store, AppState};
use linguaforge::store::{MemoryRankedSet, MemoryStore};

async fn app() -> Router {
    let config = AppConfig::default();
    let store = Arc::new(MemoryStore::seeded(11));
    seed_store(&store, &config).await;
    let state = AppState::from_parts(config, store, Arc::new(MemoryRankedSet::new()));
    state.leaderboard.rebuild_all().await;
    build_router(Arc::new(state))
}

fn get(uri: &str, player: Option<i64>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(p) = player {
        req = req.header("X-Player-Id", p.to_string());
    }
    req.body(Body::empty()).unwrap()
}

fn post(uri: &str, player: Option<i64>, body: Value) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(p) = player {
        req = req.header("X-Player-Id", p.to_string());
    }
    req.body(Body::from(body.to_string())).unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = call(&app, get("/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn game_routes_require_identity() {
    let app = app().await;
    let (status, body) = call(&app, get("/api/v1/games/adventure/start?level=1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let req = Request::builder()
        .uri("/api/v1/leaderboard/rank")
        .header("X-Player-Id", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn adventure_start_returns_rounds() {
    let app = app().await;
    let (status, body) = call(&app, get("/api/v1/games/adventure/start?level=1", Some(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["player_id"], 1);
    assert_eq!(body["current_level"], 1);
    let words = body["words"].as_array().unwrap();
    let rounds = body["rounds"].as_array().unwrap();
    assert!(!words.is_empty());
    assert_eq!(words.len(), rounds.len());
    for round in rounds {
        let correct = round["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["correct"] == true)
            .count();
        assert_eq!(correct, 1);
    }
}

#[tokio::test]
async fn start_dispatches_on_game_type() {
    let app = app().await;
    let (status, body) = call(&app, post("/api/v1/games/start", Some(2), json!({ "game_type": "defense", "level": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_type"], "defense");
    assert_eq!(body["health"], 100);
    assert_eq!(body["coins"], 50);
    assert_eq!(body["enemies"].as_array().unwrap().len(), 9);
    assert_eq!(body["towers"].as_array().unwrap().len(), 5);

    let (status, body) = call(&app, post("/api/v1/games/start", Some(2), json!({ "game_type": "dubbing", "level": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scene_id"], 1);

    let (status, body) = call(&app, post("/api/v1/games/start", Some(2), json!({ "game_type": "dubbing", "level": 77 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = call(&app, get("/api/v1/games/adventure/start?level=4000000000", Some(2))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = call(&app, post("/api/v1/games/start", Some(2), json!({ "game_type": "chess", "level": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn submit_then_rank_and_leaderboard() {
    let app = app().await;
    let (status, _) = call(&app, get("/api/v1/leaderboard/rank?type=adventure", Some(1))).await;
    assert_eq!(status, StatusCode::OK);

    let submit = json!({ "game_type": "adventure", "score": 500, "level_reached": 3, "time_spent": 120 });
    let (status, body) = call(&app, post("/api/v1/games/submit", Some(1), submit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["score"], 500);
    assert_eq!(body["record"]["game_type"], "adventure");

    let (status, body) = call(&app, get("/api/v1/leaderboard/rank?type=adventure", Some(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "player_id": 1, "rank": 1, "type": "adventure" }));

    let (_, body) = call(&app, get("/api/v1/leaderboard/rank?type=dubbing", Some(1))).await;
    assert_eq!(body["rank"], Value::Null);

    let (status, body) = call(&app, get("/api/v1/leaderboard?type=adventure&limit=5", Some(3))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "adventure");
    assert_eq!(body["entries"][0]["username"], "alice");
    assert_eq!(body["entries"][0]["rank"], 1);
    assert_eq!(body["total"], 1);

    let (_, history) = call(&app, get("/api/v1/games/history", Some(1))).await;
    assert_eq!(history["total"], 1);
}

#[tokio::test]
async fn defense_submit_forces_type() {
    let app = app().await;
    let (status, body) = call(&app, post("/api/v1/games/defense/submit", Some(2), json!({ "score": 80, "level_reached": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["game_type"], "defense");

    let (_, body) = call(&app, get("/api/v1/games/history?game_type=defense&limit=0", Some(2))).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn negative_score_is_rejected() {
    let app = app().await;
    let submit = json!({ "game_type": "adventure", "score": -5 });
    let (status, body) = call(&app, post("/api/v1/games/submit", Some(1), submit)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unknown_player_is_not_found() {
    let app = app().await;
    let submit = json!({ "game_type": "adventure", "score": 10 });
    let (status, _) = call(&app, post("/api/v1/games/submit", Some(999), submit)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dubbing_upload_validates_audio_and_scene() {
    let app = app().await;
    let ok = json!({ "scene_id": 1, "script_id": 2, "audio_data": "UklGRiQAAABXQVZF", "time_spent": 8 });
    let (status, body) = call(&app, post("/api/v1/games/dubbing/upload", Some(3), ok)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["dubbing"], json!({ "scene_id": 1, "script_id": 2 }));

    let missing = json!({ "scene_id": 40, "script_id": 1, "audio_data": "UklGRiQAAABXQVZF" });
    let (status, _) = call(&app, post("/api/v1/games/dubbing/upload", Some(3), missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let garbage = json!({ "scene_id": 1, "script_id": 1, "audio_data": "***" });
    let (status, _) = call(&app, post("/api/v1/games/dubbing/upload", Some(3), garbage)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_leaderboard_and_bad_type() {
    let app = app().await;
    let (status, body) = call(&app, get("/api/v1/public/leaderboard/top?limit=2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "overall");
    assert_eq!(body["entries"][0]["username"], "chen");
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, get("/api/v1/public/leaderboard?type=yearly", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn categories_are_listed() {
    let app = app().await;
    let (status, body) = call(&app, get("/api/v1/words/categories", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!(["animals", "food", "travel"]));
}
