//! Routes for proposals and votes.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::post};
use loom_core::gateway::ProposalOutcome;
use loom_core::model::VoteChoice;
use loom_voting::application::command_handlers::{self, VoteOutcome};
use loom_voting::domain::commands::{self, GameStartKind};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /games/{game_id}/proposals.
#[derive(Debug, Deserialize)]
pub struct ProposeGameStartRequest {
    /// The proposing member.
    pub actor_id: Uuid,
    /// Which setup milestone.
    pub kind: GameStartKind,
}

/// Request body for POST /games/{game_id}/proposals/{proposal_id}/votes.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// The voting member.
    pub actor_id: Uuid,
    /// `yes`, `no` or `suggest_modification`.
    pub choice: VoteChoice,
    /// Suggested change, for `suggest_modification`.
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// POST /games/{game_id}/proposals
#[instrument(skip(state, request), fields(kind = ?request.kind))]
async fn propose_game_start(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<ProposeGameStartRequest>,
) -> Result<Json<ProposalOutcome>, ApiError> {
    let command = commands::ProposeGameStart {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        kind: request.kind,
    };

    info!(correlation_id = %command.correlation_id, "handling propose_game_start command");

    let outcome = command_handlers::handle_propose_game_start(&command, &state.ctx()).await?;
    Ok(Json(outcome))
}

/// POST /games/{game_id}/proposals/{proposal_id}/votes
#[instrument(skip(state, request), fields(choice = ?request.choice))]
async fn cast_vote(
    State(state): State<AppState>,
    Path((game_id, proposal_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let command = commands::CastVote {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        proposal_id,
        choice: request.choice,
        suggestion: request.suggestion,
    };

    info!(correlation_id = %command.correlation_id, "handling cast_vote command");

    let outcome = command_handlers::handle_cast_vote(&command, &state.ctx()).await?;
    Ok(Json(outcome))
}

/// Returns the router for the voting context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games/{game_id}/proposals", post(propose_game_start))
        .route(
            "/games/{game_id}/proposals/{proposal_id}/votes",
            post(cast_vote),
        )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use loom_core::model::GameStatus;
    use serde_json::json;

    use super::*;
    use crate::routes::test_helpers::{seed_game, seed_game_in, send, test_app_state};

    #[tokio::test]
    async fn test_second_yes_approves_ready_to_play() {
        // Arrange
        let state = test_app_state();
        let game = seed_game_in(&state, 3, GameStatus::Setup).await;
        let app = router().with_state(state.clone());
        let (status, opened) = send(
            app.clone(),
            "POST",
            &format!("/games/{}/proposals", game.id),
            Some(json!({ "actor_id": game.members[0], "kind": "ready_to_play" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened["auto_approved"], false);
        let proposal_id = opened["proposal"]["id"].as_str().unwrap().to_owned();

        // Act
        let (status, json) = send(
            app,
            "POST",
            &format!("/games/{}/proposals/{proposal_id}/votes", game.id),
            Some(json!({ "actor_id": game.members[1], "choice": "yes" })),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["resolved"], true);
        assert_eq!(json["proposal"]["status"], "approved");
        let arena = state.store.load_arena(game.id).await.unwrap();
        assert_eq!(arena.game().status, GameStatus::Active);
    }

    #[tokio::test]
    async fn test_game_start_on_active_game_returns_409() {
        let state = test_app_state();
        let game = seed_game(&state, 2).await;
        let app = router().with_state(state);

        let (status, json) = send(
            app,
            "POST",
            &format!("/games/{}/proposals", game.id),
            Some(json!({ "actor_id": game.members[0], "kind": "world_doc_approval" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "invalid_state");
    }

    #[tokio::test]
    async fn test_double_vote_returns_already_voted() {
        // Arrange
        let state = test_app_state();
        let game = seed_game_in(&state, 5, GameStatus::Setup).await;
        let app = router().with_state(state);
        let (_, opened) = send(
            app.clone(),
            "POST",
            &format!("/games/{}/proposals", game.id),
            Some(json!({ "actor_id": game.members[0], "kind": "world_doc_approval" })),
        )
        .await;
        let uri = format!(
            "/games/{}/proposals/{}/votes",
            game.id,
            opened["proposal"]["id"].as_str().unwrap()
        );
        let body = json!({ "actor_id": game.members[1], "choice": "no" });
        send(app.clone(), "POST", &uri, Some(body.clone())).await;

        // Act
        let (status, json) = send(app, "POST", &uri, Some(body)).await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "already_voted");
    }

    #[tokio::test]
    async fn test_vote_by_outsider_returns_403() {
        let state = test_app_state();
        let game = seed_game_in(&state, 3, GameStatus::Setup).await;
        let app = router().with_state(state);
        let (_, opened) = send(
            app.clone(),
            "POST",
            &format!("/games/{}/proposals", game.id),
            Some(json!({ "actor_id": game.members[0], "kind": "ready_to_play" })),
        )
        .await;

        let (status, json) = send(
            app,
            "POST",
            &format!(
                "/games/{}/proposals/{}/votes",
                game.id,
                opened["proposal"]["id"].as_str().unwrap()
            ),
            Some(json!({ "actor_id": Uuid::new_v4(), "choice": "yes" })),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "forbidden");
    }
}
