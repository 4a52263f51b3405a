//! Routes for creating and reading games.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::{get, post}};
use loom_core::model::{Game, GameSettings};
use loom_narrative::application::command_handlers;
use loom_narrative::application::query_handlers::{self, GameView};
use loom_narrative::domain::commands;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::resolve_due;
use crate::state::AppState;

/// Request body for POST /games.
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    /// Display name.
    pub name: String,
    /// Participants, in join order.
    pub members: Vec<Uuid>,
    /// Decision policy; omitted fields take their defaults.
    #[serde(default)]
    pub settings: GameSettings,
}

/// POST /games
#[instrument(skip(state, request), fields(members = request.members.len()))]
async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<Game>, ApiError> {
    let command = commands::CreateGame {
        correlation_id: Uuid::new_v4(),
        game_id: Uuid::new_v4(),
        name: request.name,
        members: request.members,
        settings: request.settings,
    };

    info!(correlation_id = %command.correlation_id, "handling create_game command");

    let game = command_handlers::handle_create_game(&command, &state.ctx()).await?;
    Ok(Json(game))
}

/// GET /games/{game_id}
#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    resolve_due(&state, game_id).await?;
    let view = query_handlers::get_game_view(game_id, &*state.store).await?;
    Ok(Json(view))
}

/// Returns the router for games.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{game_id}", get(get_game))
}
