pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::portfolio::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Portfolio API
        .route("/api/v1/portfolio/build", post(handlers::handle_build))
        .route("/api/v1/portfolio/deploy", post(handlers::handle_deploy))
        .with_state(state)
}
