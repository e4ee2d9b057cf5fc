//! Dating Sim - live two-character dialogue steered by a judge
//!
//! Two characters are created during setup and persisted. Once a session
//! starts, an external generation service writes the dialogue one round at
//! a time while the judge nudges it with feedback and scores.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod generation;
mod routes;
mod session;
mod store;

use config::Config;
use crate::core::LiveSession;
use generation::{GenerationService, HttpGenerationClient};
use store::CharacterStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<CharacterStore>,
    pub generator: Arc<dyn GenerationService>,
    /// At most one live session; replacing it ends the previous one
    pub live: Arc<Mutex<Option<LiveSession>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dating_sim=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = Arc::new(CharacterStore::open(&config.data_dir.join("characters.db")).await?);

    if let Some(cast) = &config.cast {
        if store.load_roster().await?.is_none() {
            store.save_roster(cast).await?;
            tracing::info!("Seeded character roster from config");
        }
    }

    let generator = Arc::new(HttpGenerationClient::new(
        config.generation_url.clone(),
        config.generation_timeout(),
    )?);
    tracing::info!(endpoint = %config.generation_url, "Using generation service");

    let state = AppState {
        config,
        store,
        generator,
        live: Arc::new(Mutex::new(None)),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Dating sim API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
