//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use loom_api::state::AppState;
use loom_core::clock::Clock;
use loom_core::repository::NarrativeStore;
use loom_core::rng::DeterministicRng;
use loom_store::MemoryStore;
use loom_test_support::{FixedClock, MockRng, RecordingNotifier, ScriptedAssistant, fixed_now};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Builds the full app over a fresh in-memory store, with a clock fixed at
/// 2026-01-15 10:00 UTC and an RNG that always draws the minimum.
pub fn build_test_app() -> (Router, Arc<dyn NarrativeStore>) {
    let store: Arc<dyn NarrativeStore> = Arc::new(MemoryStore::new());
    (build_test_app_with(store.clone(), MockRng, fixed_now()), store)
}

/// Builds the full app over a fresh in-memory store behind `cors`.
pub fn build_test_app_with_cors(cors: CorsLayer) -> Router {
    loom_api::app_with_cors(
        test_state(Arc::new(MemoryStore::new()), MockRng, fixed_now()),
        cors,
    )
}

/// Builds the full app over `store` with the given RNG and clock reading.
pub fn build_test_app_with(
    store: Arc<dyn NarrativeStore>,
    rng: impl DeterministicRng + Send + 'static,
    now: DateTime<Utc>,
) -> Router {
    loom_api::app(test_state(store, rng, now))
}

fn test_state(
    store: Arc<dyn NarrativeStore>,
    rng: impl DeterministicRng + Send + 'static,
    now: DateTime<Utc>,
) -> AppState {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock(now));
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(rng));
    AppState::new(
        clock,
        rng,
        store,
        Arc::new(ScriptedAssistant::default()),
        Arc::new(RecordingNotifier::new()),
    )
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Creates a game through the API and returns its id.
pub async fn create_game(app: &Router, members: &[Uuid]) -> String {
    let (status, game) = post_json(
        app.clone(),
        "/api/v1/games",
        &json!({ "name": "The Salt Road", "members": members }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    game["id"].as_str().unwrap().to_owned()
}

/// Opens a proposal as the first member and has every other member vote
/// yes. Returns the opening outcome.
async fn propose_and_approve(app: &Router, game_id: &str, members: &[Uuid], uri: &str, body: Value) -> Value {
    let (status, outcome) = post_json(app.clone(), uri, &body).await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    let proposal_id = outcome["proposal"]["id"].as_str().unwrap().to_owned();
    for voter in &members[1..] {
        post_json(
            app.clone(),
            &format!("/api/v1/games/{game_id}/proposals/{proposal_id}/votes"),
            &json!({ "actor_id": voter, "choice": "yes" }),
        )
        .await;
    }
    outcome
}

/// Creates a game and plays it to an active scene, every member approving
/// each step. Returns the game id and the scene id.
pub async fn game_with_scene(app: &Router, members: &[Uuid]) -> (String, String) {
    let game_id = create_game(app, members).await;
    propose_and_approve(
        app,
        &game_id,
        members,
        &format!("/api/v1/games/{game_id}/proposals"),
        json!({ "actor_id": members[0], "kind": "ready_to_play" }),
    )
    .await;
    let act = propose_and_approve(
        app,
        &game_id,
        members,
        &format!("/api/v1/games/{game_id}/acts"),
        json!({ "actor_id": members[0], "guiding_question": "Who burned the lighthouse?" }),
    )
    .await;
    let act_id = act["proposal"]["subject"]["act_id"].as_str().unwrap().to_owned();
    let scene = propose_and_approve(
        app,
        &game_id,
        members,
        &format!("/api/v1/games/{game_id}/acts/{act_id}/scenes"),
        json!({ "actor_id": members[0], "guiding_question": "What waits at the quay?" }),
    )
    .await;
    let scene_id = scene["proposal"]["subject"]["scene_id"].as_str().unwrap().to_owned();
    (game_id, scene_id)
}
