//! Axum route handlers for the Portfolio API.

use std::path::{Path, PathBuf};

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::AppError;
use crate::github::Credentials;
use crate::models::resume::ResumeRecord;
use crate::portfolio::builder::build_site;
use crate::portfolio::template::TemplateId;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub resume: ResumeRecord,
    pub template_name: String,
}

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub message: String,
    pub output_dir: PathBuf,
    pub template_name: TemplateId,
}

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub output_dir: PathBuf,
    /// Defaults to `portfolio-{login}-{timestamp}`.
    pub repo_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub message: String,
    pub url: String,
    pub repository_url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/portfolio/build
///
/// Fills the chosen template with the resume and writes the site to disk.
/// The returned `output_dir` is what the deploy endpoint takes.
pub async fn handle_build(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, AppError> {
    let template: TemplateId = request.template_name.parse()?;

    let built = build_site(
        &state.config.templates_dir,
        &state.config.output_dir,
        &request.resume,
        template,
    )
    .await?;

    Ok(Json(BuildResponse {
        message: "Template generated successfully".to_string(),
        output_dir: built.output_dir,
        template_name: built.template,
    }))
}

/// POST /api/v1/portfolio/deploy
///
/// Publishes a built site to GitHub Pages under the caller's account.
/// Requires `Authorization: Bearer <github token>`.
pub async fn handle_deploy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, AppError> {
    let credentials = bearer_credentials(&headers)?;
    let site_dir = resolve_site_dir(&state.config.output_dir, &request.output_dir).await?;

    let repo_name = match request.repo_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name.trim().to_string(),
        None => {
            let login = state.github.authenticated_user(&credentials).await?;
            default_repo_name(&login, Utc::now())
        }
    };

    // The publish runs on its own task so in-flight GitHub calls finish if
    // the client disconnects. Dropping this handler fires the token, and the
    // publisher starts no further step.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let publisher = state.publisher.clone();
    let task = tokio::spawn(async move {
        publisher
            .publish(&site_dir, &repo_name, &credentials, &cancel)
            .await
    });
    let result = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("publish task failed: {e}")))??;

    info!(url = %result.url, "portfolio deployed");
    Ok(Json(DeployResponse {
        message: "Portfolio deployed successfully".to_string(),
        url: result.url,
        repository_url: result.repository_url,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn bearer_credentials(headers: &HeaderMap) -> Result<Credentials, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    Ok(Credentials::bearer(token))
}

/// Resolves `requested` and checks it is a build directory inside
/// `output_root`. Deploys never read arbitrary paths.
async fn resolve_site_dir(output_root: &Path, requested: &Path) -> Result<PathBuf, AppError> {
    let root = tokio::fs::canonicalize(output_root)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("output directory unavailable: {e}")))?;
    let dir = tokio::fs::canonicalize(requested)
        .await
        .map_err(|_| AppError::NotFound(format!("{} does not exist", requested.display())))?;

    if dir == root || !dir.starts_with(&root) {
        return Err(AppError::Validation(
            "output_dir must be a directory produced by the build endpoint".to_string(),
        ));
    }
    Ok(dir)
}

pub fn default_repo_name(login: &str, now: DateTime<Utc>) -> String {
    let login: String = login
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("portfolio-{login}-{}", now.timestamp())
}
