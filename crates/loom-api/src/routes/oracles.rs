//! Routes for oracle consultations.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::{get, post}};
use loom_core::model::{OracleComment, OracleEvent, OracleType, OracleVote, Significance, WordPair};
use loom_oracle::application::command_handlers::{self, OracleInvocation};
use loom_oracle::application::query_handlers::{self, OracleView};
use loom_oracle::domain::commands;
use loom_voting::application::engine::VotingEngine;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::story::CommentRequest;
use crate::state::AppState;

/// Request body for POST /games/{game_id}/scenes/{scene_id}/oracles.
#[derive(Debug, Deserialize)]
pub struct InvokeOracleRequest {
    /// The asking member.
    pub actor_id: Uuid,
    /// The open question.
    pub question: String,
    /// `personal` or `world`; world when omitted.
    #[serde(default)]
    pub oracle_type: OracleType,
    /// Prompt words; drawn from the built-in tables when omitted.
    #[serde(default)]
    pub word_seeds: Option<WordPair>,
    /// Weight of the resulting beat; minor when omitted.
    #[serde(default)]
    pub significance: Option<Significance>,
}

/// Request body for the vote and selection routes. `interpretation_index`
/// is `-1` for a custom interpretation, `-2` to let the votes decide.
#[derive(Debug, Deserialize)]
pub struct InterpretationRequest {
    /// The acting member.
    pub actor_id: Uuid,
    /// Index into the interpretations, or a sentinel.
    pub interpretation_index: i32,
    /// Text of a custom interpretation.
    #[serde(default)]
    pub custom_text: Option<String>,
}

/// POST /games/{game_id}/scenes/{scene_id}/oracles
#[instrument(skip(state, request), fields(oracle_type = ?request.oracle_type))]
async fn invoke_oracle(
    State(state): State<AppState>,
    Path((game_id, scene_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InvokeOracleRequest>,
) -> Result<Json<OracleInvocation>, ApiError> {
    let command = commands::InvokeOracle {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        scene_id,
        question: request.question,
        oracle_type: request.oracle_type,
        word_seeds: request.word_seeds,
        significance: request.significance,
    };

    info!(correlation_id = %command.correlation_id, "handling invoke_oracle command");

    let ctx = state.ctx();
    let invocation =
        command_handlers::handle_invoke_oracle(&command, &ctx, &VotingEngine::new(ctx)).await?;
    Ok(Json(invocation))
}

/// POST /games/{game_id}/oracles/{oracle_id}/votes
#[instrument(skip(state, request), fields(index = request.interpretation_index))]
async fn vote_on_interpretation(
    State(state): State<AppState>,
    Path((game_id, oracle_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InterpretationRequest>,
) -> Result<Json<OracleVote>, ApiError> {
    let command = commands::VoteOnInterpretation {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        oracle_id,
        interpretation_index: request.interpretation_index,
        custom_text: request.custom_text,
    };

    info!(correlation_id = %command.correlation_id, "handling vote_on_interpretation command");

    let vote = command_handlers::handle_vote_on_interpretation(&command, &state.ctx()).await?;
    Ok(Json(vote))
}

/// POST /games/{game_id}/oracles/{oracle_id}/comments
#[instrument(skip(state, request))]
async fn comment_on_oracle(
    State(state): State<AppState>,
    Path((game_id, oracle_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<OracleComment>, ApiError> {
    let command = commands::CommentOnOracle {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        oracle_id,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling comment_on_oracle command");

    let comment = command_handlers::handle_comment_on_oracle(&command, &state.ctx()).await?;
    Ok(Json(comment))
}

/// POST /games/{game_id}/oracles/{oracle_id}/selection
#[instrument(skip(state, request), fields(index = request.interpretation_index))]
async fn select_interpretation(
    State(state): State<AppState>,
    Path((game_id, oracle_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InterpretationRequest>,
) -> Result<Json<OracleEvent>, ApiError> {
    let command = commands::SelectInterpretation {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        oracle_id,
        interpretation_index: request.interpretation_index,
        custom_text: request.custom_text,
    };

    info!(correlation_id = %command.correlation_id, "handling select_interpretation command");

    let oracle = command_handlers::handle_select_interpretation(&command, &state.ctx()).await?;
    Ok(Json(oracle))
}

/// GET /games/{game_id}/oracles/{oracle_id}
#[instrument(skip(state))]
async fn get_oracle(
    State(state): State<AppState>,
    Path((game_id, oracle_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OracleView>, ApiError> {
    let view = query_handlers::get_oracle_view(game_id, oracle_id, &*state.store).await?;
    Ok(Json(view))
}

/// Returns the router for oracles.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games/{game_id}/scenes/{scene_id}/oracles", post(invoke_oracle))
        .route("/games/{game_id}/oracles/{oracle_id}", get(get_oracle))
        .route(
            "/games/{game_id}/oracles/{oracle_id}/votes",
            post(vote_on_interpretation),
        )
        .route(
            "/games/{game_id}/oracles/{oracle_id}/comments",
            post(comment_on_oracle),
        )
        .route(
            "/games/{game_id}/oracles/{oracle_id}/selection",
            post(select_interpretation),
        )
}
