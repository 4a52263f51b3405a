//! Routes for fortune rolls.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::{get, post}};
use loom_core::model::{FortuneRoll, OddsTier};
use loom_fortune::application::command_handlers::{self, FortuneRollSubmission};
use loom_fortune::application::query_handlers::{self, FortuneRollView};
use loom_fortune::domain::commands;
use loom_voting::application::engine::VotingEngine;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::story::ActorRequest;
use crate::state::AppState;

/// Request body for POST /games/{game_id}/scenes/{scene_id}/fortune-rolls.
#[derive(Debug, Deserialize)]
pub struct SubmitFortuneRollRequest {
    /// The asking member.
    pub actor_id: Uuid,
    /// The yes/no question.
    pub question: String,
    /// Declared odds, e.g. `fifty_fifty`.
    pub odds: OddsTier,
}

/// POST /games/{game_id}/scenes/{scene_id}/fortune-rolls
#[instrument(skip(state, request), fields(odds = ?request.odds))]
async fn submit_fortune_roll(
    State(state): State<AppState>,
    Path((game_id, scene_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SubmitFortuneRollRequest>,
) -> Result<Json<FortuneRollSubmission>, ApiError> {
    let command = commands::SubmitFortuneRoll {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        scene_id,
        question: request.question,
        odds: request.odds,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_fortune_roll command");

    let submission = command_handlers::handle_submit_fortune_roll(&command, &state.ctx()).await?;
    Ok(Json(submission))
}

/// POST /games/{game_id}/fortune-rolls/{roll_id}/contest
#[instrument(skip(state, request))]
async fn contest_fortune_roll(
    State(state): State<AppState>,
    Path((game_id, roll_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<FortuneRoll>, ApiError> {
    let command = commands::ContestFortuneRoll {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        roll_id,
    };

    info!(correlation_id = %command.correlation_id, "handling contest_fortune_roll command");

    let roll = command_handlers::handle_contest_fortune_roll(&command, &state.ctx()).await?;
    Ok(Json(roll))
}

/// POST /games/{game_id}/fortune-rolls/{roll_id}/reaffirm
#[instrument(skip(state, request))]
async fn reaffirm_fortune_roll(
    State(state): State<AppState>,
    Path((game_id, roll_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<FortuneRoll>, ApiError> {
    let command = commands::ReaffirmFortuneRoll {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        roll_id,
    };

    info!(correlation_id = %command.correlation_id, "handling reaffirm_fortune_roll command");

    let roll = command_handlers::handle_reaffirm_fortune_roll(&command, &state.ctx()).await?;
    Ok(Json(roll))
}

/// GET /games/{game_id}/fortune-rolls/{roll_id}
///
/// Resolves the roll first if its contest window has passed.
#[instrument(skip(state))]
async fn get_fortune_roll(
    State(state): State<AppState>,
    Path((game_id, roll_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FortuneRollView>, ApiError> {
    let ctx = state.ctx();
    command_handlers::resolve_fortune_roll_if_due(game_id, roll_id, &ctx, &VotingEngine::new(ctx))
        .await?;
    let arena = state.store.load_arena(game_id).await?;
    let view = query_handlers::fortune_roll_view(&arena, roll_id)?;
    Ok(Json(view))
}

/// Returns the router for fortune rolls.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/games/{game_id}/scenes/{scene_id}/fortune-rolls",
            post(submit_fortune_roll),
        )
        .route("/games/{game_id}/fortune-rolls/{roll_id}", get(get_fortune_roll))
        .route(
            "/games/{game_id}/fortune-rolls/{roll_id}/contest",
            post(contest_fortune_roll),
        )
        .route(
            "/games/{game_id}/fortune-rolls/{roll_id}/reaffirm",
            post(reaffirm_fortune_roll),
        )
}
