//! Stand-alone dice rolling.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use loom_core::error::DomainError;
use loom_narrative::domain::dice::{self, DiceRoll};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /dice/rolls.
#[derive(Debug, Deserialize)]
pub struct RollDiceRequest {
    /// Notation such as `2d6+1`.
    pub notation: String,
}

/// POST /dice/rolls
#[instrument(skip(state))]
async fn roll_dice(
    State(state): State<AppState>,
    Json(request): Json<RollDiceRequest>,
) -> Result<Json<DiceRoll>, ApiError> {
    let roll = state
        .ctx()
        .with_rng(|rng| dice::roll_dice(&request.notation, rng))?
        .map_err(DomainError::from)?;
    debug!(notation = %roll.notation, total = roll.total, "dice rolled");
    Ok(Json(roll))
}

/// Returns the dice router.
pub fn router() -> Router<AppState> {
    Router::new().route("/dice/rolls", post(roll_dice))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::routes::test_helpers::{send, test_app_state};

    #[tokio::test]
    async fn test_roll_returns_dice_and_total() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let (status, json) =
            send(app, "POST", "/dice/rolls", Some(json!({ "notation": "2d6+1" }))).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["dice"], json!([1, 1]));
        assert_eq!(json["total"], 3);
    }

    #[tokio::test]
    async fn test_malformed_notation_returns_422() {
        let app = router().with_state(test_app_state());

        let (status, json) =
            send(app, "POST", "/dice/rolls", Some(json!({ "notation": "d" }))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "validation_error");
    }
}
