//! Loom API server entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use loom_api::config::Config;
use loom_api::services::{LogNotifier, PlaceholderAssistant};
use loom_api::state::AppState;
use loom_api::{app_with_cors, telemetry};
use loom_core::clock::{Clock, SystemClock};
use loom_core::repository::NarrativeStore;
use loom_core::rng::{DeterministicRng, SeededRng};
use loom_store::{MemoryStore, PgNarrativeStore, schema};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting Loom API server");

    let store: Arc<dyn NarrativeStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            schema::migrate(&pool).await?;
            Arc::new(PgNarrativeStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; games are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let rng = match config.rng_seed {
        Some(seed) => {
            info!(seed, "using a fixed RNG seed");
            SeededRng::from_seed(seed)
        }
        None => SeededRng::from_os(),
    };
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(rng));
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);

    let app_state = AppState::new(
        clock,
        rng,
        store,
        Arc::new(PlaceholderAssistant),
        Arc::new(LogNotifier),
    );

    let cors = config.cors_layer()?;
    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app_with_cors(app_state, cors)).await?;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            warn!(error = %e, "tracer provider did not shut down cleanly");
        }
    }
    Ok(())
}
