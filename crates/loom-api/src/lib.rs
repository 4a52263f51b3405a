//! Loom: HTTP API.
//!
//! Exposes the engine's commands and views as JSON routes under `/api/v1`.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router, allowing any origin.
pub fn app(state: AppState) -> Router {
    app_with_cors(state, CorsLayer::permissive())
}

/// Builds the full application router behind the given CORS layer.
pub fn app_with_cors(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .merge(routes::health::router())
        .merge(routes::games::router())
        .merge(routes::voting::router())
        .merge(routes::story::router())
        .merge(routes::fortune::router())
        .merge(routes::oracles::router())
        .merge(routes::dice::router());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
