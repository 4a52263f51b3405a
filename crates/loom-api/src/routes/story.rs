//! Routes for acts, scenes and beats.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::{get, post}};
use loom_core::gateway::ProposalOutcome;
use loom_core::model::{Beat, BeatComment, Significance};
use loom_narrative::application::command_handlers::{self, BeatRevision, BeatSubmission};
use loom_narrative::application::query_handlers::{self, SceneView};
use loom_narrative::domain::commands::{self, BeatEventInput};
use loom_voting::application::engine::VotingEngine;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::resolve_due;
use crate::state::AppState;

/// Request body for POST /games/{game_id}/acts.
#[derive(Debug, Deserialize)]
pub struct ProposeActRequest {
    /// The proposing member.
    pub actor_id: Uuid,
    /// Act title; blank titles are numbered.
    #[serde(default)]
    pub title: String,
    /// The question the act explores.
    pub guiding_question: String,
}

/// Request body for POST /games/{game_id}/acts/{act_id}/scenes.
#[derive(Debug, Deserialize)]
pub struct ProposeSceneRequest {
    /// The proposing member.
    pub actor_id: Uuid,
    /// The question the scene explores.
    pub guiding_question: String,
    /// Where it happens.
    #[serde(default)]
    pub location: Option<String>,
    /// Starting tension; inherited when omitted.
    #[serde(default)]
    pub tension: Option<i32>,
}

/// Body carrying only the acting member.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    /// The acting member.
    pub actor_id: Uuid,
}

/// Request body for POST /games/{game_id}/scenes/{scene_id}/beats.
#[derive(Debug, Deserialize)]
pub struct SubmitBeatRequest {
    /// The author.
    pub actor_id: Uuid,
    /// Ordered beat contents.
    pub events: Vec<BeatEventInput>,
    /// Forces minor or major; classified when omitted.
    #[serde(default)]
    pub significance: Option<Significance>,
}

/// Request body for POST /games/{game_id}/beats/{beat_id}/challenge.
#[derive(Debug, Deserialize)]
pub struct ChallengeBeatRequest {
    /// The challenger.
    pub actor_id: Uuid,
    /// Why the beat should change.
    pub reason: String,
}

/// Request body for POST /games/{game_id}/beats/{beat_id}/challenge/accept.
#[derive(Debug, Deserialize)]
pub struct AcceptChallengeRequest {
    /// The author.
    pub actor_id: Uuid,
    /// Replacement prose.
    pub revised_content: String,
}

/// Request body for comment routes.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// The commenter.
    pub actor_id: Uuid,
    /// Comment text.
    pub content: String,
}

/// POST /games/{game_id}/acts
#[instrument(skip(state, request))]
async fn propose_act(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<ProposeActRequest>,
) -> Result<Json<ProposalOutcome>, ApiError> {
    let command = commands::ProposeAct {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        title: request.title,
        guiding_question: request.guiding_question,
    };

    info!(correlation_id = %command.correlation_id, "handling propose_act command");

    let ctx = state.ctx();
    let outcome = command_handlers::handle_propose_act(&command, &ctx, &VotingEngine::new(ctx)).await?;
    Ok(Json(outcome))
}

/// POST /games/{game_id}/acts/{act_id}/complete
#[instrument(skip(state, request))]
async fn propose_act_complete(
    State(state): State<AppState>,
    Path((game_id, act_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<ProposalOutcome>, ApiError> {
    let command = commands::ProposeActComplete {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        act_id,
    };

    info!(correlation_id = %command.correlation_id, "handling propose_act_complete command");

    let ctx = state.ctx();
    let outcome =
        command_handlers::handle_propose_act_complete(&command, &ctx, &VotingEngine::new(ctx))
            .await?;
    Ok(Json(outcome))
}

/// POST /games/{game_id}/acts/{act_id}/scenes
#[instrument(skip(state, request), fields(tension = ?request.tension))]
async fn propose_scene(
    State(state): State<AppState>,
    Path((game_id, act_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ProposeSceneRequest>,
) -> Result<Json<ProposalOutcome>, ApiError> {
    let command = commands::ProposeScene {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        act_id,
        guiding_question: request.guiding_question,
        location: request.location,
        tension: request.tension,
    };

    info!(correlation_id = %command.correlation_id, "handling propose_scene command");

    let ctx = state.ctx();
    let outcome =
        command_handlers::handle_propose_scene(&command, &ctx, &VotingEngine::new(ctx)).await?;
    Ok(Json(outcome))
}

/// POST /games/{game_id}/scenes/{scene_id}/complete
#[instrument(skip(state, request))]
async fn propose_scene_complete(
    State(state): State<AppState>,
    Path((game_id, scene_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<ProposalOutcome>, ApiError> {
    let command = commands::ProposeSceneComplete {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        scene_id,
    };

    info!(correlation_id = %command.correlation_id, "handling propose_scene_complete command");

    let ctx = state.ctx();
    let outcome =
        command_handlers::handle_propose_scene_complete(&command, &ctx, &VotingEngine::new(ctx))
            .await?;
    Ok(Json(outcome))
}

/// GET /games/{game_id}/scenes/{scene_id}
#[instrument(skip(state))]
async fn get_scene(
    State(state): State<AppState>,
    Path((game_id, scene_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SceneView>, ApiError> {
    resolve_due(&state, game_id).await?;
    let view = query_handlers::get_scene_view(game_id, scene_id, &*state.store).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/scenes/{scene_id}/beats
#[instrument(skip(state, request), fields(events = request.events.len()))]
async fn submit_beat(
    State(state): State<AppState>,
    Path((game_id, scene_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SubmitBeatRequest>,
) -> Result<Json<BeatSubmission>, ApiError> {
    let command = commands::SubmitBeat {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        scene_id,
        events: request.events,
        significance: request.significance,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_beat command");

    let ctx = state.ctx();
    let submission =
        command_handlers::handle_submit_beat(&command, &ctx, &VotingEngine::new(ctx)).await?;
    Ok(Json(submission))
}

/// POST /games/{game_id}/beats/{beat_id}/challenge
#[instrument(skip(state, request))]
async fn challenge_beat(
    State(state): State<AppState>,
    Path((game_id, beat_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ChallengeBeatRequest>,
) -> Result<Json<Beat>, ApiError> {
    let command = commands::ChallengeBeat {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        beat_id,
        reason: request.reason,
    };

    info!(correlation_id = %command.correlation_id, "handling challenge_beat command");

    let beat = command_handlers::handle_challenge_beat(&command, &state.ctx()).await?;
    Ok(Json(beat))
}

/// POST /games/{game_id}/beats/{beat_id}/challenge/accept
#[instrument(skip(state, request))]
async fn accept_challenge(
    State(state): State<AppState>,
    Path((game_id, beat_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AcceptChallengeRequest>,
) -> Result<Json<BeatRevision>, ApiError> {
    let command = commands::AcceptChallenge {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        beat_id,
        revised_content: request.revised_content,
    };

    info!(correlation_id = %command.correlation_id, "handling accept_challenge command");

    let ctx = state.ctx();
    let revision =
        command_handlers::handle_accept_challenge(&command, &ctx, &VotingEngine::new(ctx)).await?;
    Ok(Json(revision))
}

/// POST /games/{game_id}/beats/{beat_id}/challenge/dismiss
#[instrument(skip(state, request))]
async fn dismiss_challenge(
    State(state): State<AppState>,
    Path((game_id, beat_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<Beat>, ApiError> {
    let command = commands::DismissChallenge {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        beat_id,
    };

    info!(correlation_id = %command.correlation_id, "handling dismiss_challenge command");

    let beat = command_handlers::handle_dismiss_challenge(&command, &state.ctx()).await?;
    Ok(Json(beat))
}

/// POST /games/{game_id}/beats/{beat_id}/comments
#[instrument(skip(state, request))]
async fn comment_on_beat(
    State(state): State<AppState>,
    Path((game_id, beat_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<BeatComment>, ApiError> {
    let command = commands::CommentOnBeat {
        correlation_id: Uuid::new_v4(),
        game_id,
        actor_id: request.actor_id,
        beat_id,
        content: request.content,
    };

    info!(correlation_id = %command.correlation_id, "handling comment_on_beat command");

    let comment = command_handlers::handle_comment_on_beat(&command, &state.ctx()).await?;
    Ok(Json(comment))
}

/// Returns the router for acts, scenes and beats.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games/{game_id}/acts", post(propose_act))
        .route("/games/{game_id}/acts/{act_id}/complete", post(propose_act_complete))
        .route("/games/{game_id}/acts/{act_id}/scenes", post(propose_scene))
        .route("/games/{game_id}/scenes/{scene_id}", get(get_scene))
        .route(
            "/games/{game_id}/scenes/{scene_id}/complete",
            post(propose_scene_complete),
        )
        .route("/games/{game_id}/scenes/{scene_id}/beats", post(submit_beat))
        .route("/games/{game_id}/beats/{beat_id}/challenge", post(challenge_beat))
        .route(
            "/games/{game_id}/beats/{beat_id}/challenge/accept",
            post(accept_challenge),
        )
        .route(
            "/games/{game_id}/beats/{beat_id}/challenge/dismiss",
            post(dismiss_challenge),
        )
        .route("/games/{game_id}/beats/{beat_id}/comments", post(comment_on_beat))
}
