mod config;
mod errors;
mod github;
mod models;
mod portfolio;
mod publish;
mod retry;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::github::{GitHost, GitHubClient};
use crate::publish::{PublishOptions, Publisher};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Built sites live here until they are deployed
    tokio::fs::create_dir_all(&config.output_dir).await?;
    info!("Site output directory: {}", config.output_dir.display());

    // Initialize GitHub client
    let github: Arc<dyn GitHost> = Arc::new(GitHubClient::new(config.github_api_url.clone())?);
    info!("GitHub client initialized (api: {})", config.github_api_url);

    let publisher = Arc::new(Publisher::new(
        github.clone(),
        PublishOptions {
            commit_message: config.commit_message.clone(),
            ..PublishOptions::default()
        },
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        github,
        publisher,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the frontend origin once it is configurable

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
