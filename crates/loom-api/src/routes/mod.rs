//! Route modules organized by bounded context.

pub mod dice;
pub mod fortune;
pub mod games;
pub mod health;
pub mod oracles;
pub mod story;
pub mod voting;

use loom_core::error::DomainError;
use loom_fortune::application::command_handlers::resolve_due_fortune_rolls;
use loom_voting::application::command_handlers::resolve_due_proposals;
use loom_voting::application::engine::VotingEngine;
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Settles what has come due in a game before it is read: fortune rolls
/// whose contest window passed, then proposals whose silence timer ran out.
pub(crate) async fn resolve_due(state: &AppState, game_id: Uuid) -> Result<(), DomainError> {
    let ctx = state.ctx();
    let engine = VotingEngine::new(ctx);
    let rolls = resolve_due_fortune_rolls(game_id, &ctx, &engine).await?;
    let proposals = resolve_due_proposals(game_id, &ctx).await?;
    if !rolls.is_empty() || !proposals.is_empty() {
        debug!(%game_id, rolls = rolls.len(), proposals = proposals.len(), "lazy resolution");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use loom_core::clock::Clock;
    use loom_core::model::{Game, GameSettings, GameStatus};
    use loom_core::repository::NarrativeStore;
    use loom_core::rng::DeterministicRng;
    use loom_store::MemoryStore;
    use loom_test_support::{FixedClock, MockRng, RecordingNotifier, ScriptedAssistant, fixed_now};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::state::AppState;

    pub(crate) fn app_state_with(store: Arc<dyn NarrativeStore>) -> AppState {
        app_state_at(store, fixed_now())
    }

    /// State over `store` whose clock reads `now`.
    pub(crate) fn app_state_at(store: Arc<dyn NarrativeStore>, now: DateTime<Utc>) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock(now));
        let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
        AppState::new(
            clock,
            rng,
            store,
            Arc::new(ScriptedAssistant::default()),
            Arc::new(RecordingNotifier::new()),
        )
    }

    pub(crate) fn test_app_state() -> AppState {
        app_state_with(Arc::new(MemoryStore::new()))
    }

    /// Stores an active game with `members` participants.
    pub(crate) async fn seed_game(state: &AppState, members: usize) -> Game {
        seed_game_in(state, members, GameStatus::Active).await
    }

    pub(crate) async fn seed_game_in(state: &AppState, members: usize, status: GameStatus) -> Game {
        let game = Game {
            id: Uuid::new_v4(),
            name: "The Salt Road".to_owned(),
            status,
            members: (0..members).map(|_| Uuid::new_v4()).collect(),
            settings: GameSettings::default(),
            created_at: fixed_now(),
        };
        state.store.create_game(&game).await.unwrap();
        game
    }

    /// Plays a one-member game up to an active scene through the story
    /// routes; every proposal passes on the proposer's implicit vote.
    /// Returns the act and scene ids.
    pub(crate) async fn active_scene(state: &AppState, game: &Game) -> (String, String) {
        let app = super::story::router().with_state(state.clone());
        let (status, act) = send(
            app.clone(),
            "POST",
            &format!("/games/{}/acts", game.id),
            Some(json!({
                "actor_id": game.members[0],
                "guiding_question": "Who burned the lighthouse?"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(act["auto_approved"], true);
        let act_id = act["proposal"]["subject"]["act_id"].as_str().unwrap().to_owned();

        let (status, scene) = send(
            app,
            "POST",
            &format!("/games/{}/acts/{act_id}/scenes", game.id),
            Some(json!({
                "actor_id": game.members[0],
                "guiding_question": "What waits at the quay?",
                "location": "the harbour"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let scene_id = scene["proposal"]["subject"]["scene_id"].as_str().unwrap().to_owned();
        (act_id, scene_id)
    }

    pub(crate) async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(serde_json::to_vec(&json).unwrap()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
