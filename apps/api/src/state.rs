use std::sync::Arc;

use crate::config::Config;
use crate::github::GitHost;
use crate::publish::Publisher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// GitHub access. `GitHubClient` in production, an in-memory host in tests.
    pub github: Arc<dyn GitHost>,
    pub publisher: Arc<Publisher>,
}
