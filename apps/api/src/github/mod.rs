//! GitHub access for the publisher.
//!
//! [`GitHost`] is the seam between the publish workflow and the remote git
//! host. `GitHubClient` implements it over the REST API; tests swap in an
//! in-memory host. Everything the publisher needs from the host goes through
//! this trait.

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod models;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::retry::Retryable;

pub use client::GitHubClient;
pub use models::{CreateRepoOutcome, RepoId, Repository, TreeEntry};

/// Bearer token for one GitHub account. Never logged.
#[derive(Clone)]
pub struct Credentials(String);

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credentials rejected (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GitHubError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Http(e) => e.status().map(|s| s.as_u16()),
            GitHubError::Unauthorized { status, .. } | GitHubError::Api { status, .. } => {
                Some(*status)
            }
            GitHubError::Decode(_) => None,
        }
    }
}

impl Retryable for GitHubError {
    /// Network failures, rate limiting, 5xx, and the 404/409/422 responses
    /// GitHub returns while a freshly pushed branch is still propagating.
    fn is_retryable(&self) -> bool {
        match self {
            GitHubError::Http(_) => true,
            GitHubError::Api { status, .. } => {
                matches!(status, 404 | 409 | 422 | 429) || *status >= 500
            }
            GitHubError::Unauthorized { .. } | GitHubError::Decode(_) => false,
        }
    }
}

/// Remote operations needed to publish a site.
///
/// Every call carries the caller's credentials; implementations hold no
/// per-user state.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Login of the account the credentials belong to.
    async fn authenticated_user(&self, credentials: &Credentials) -> Result<String, GitHubError>;

    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &str,
    ) -> Result<CreateRepoOutcome, GitHubError>;

    async fn get_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
    ) -> Result<Repository, GitHubError>;

    /// Commit sha at the tip of `branch`, or `None` for an empty repository.
    async fn branch_head(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<String>, GitHubError>;

    async fn create_blob(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        content: &[u8],
    ) -> Result<String, GitHubError>;

    /// Creates a tree from `entries` alone. No base tree is ever used, so the
    /// result replaces whatever the repository held before.
    async fn create_tree(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        entries: &[TreeEntry],
    ) -> Result<String, GitHubError>;

    async fn create_commit(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, GitHubError>;

    async fn create_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError>;

    /// Force-moves `heads/{branch}` to `sha`.
    async fn update_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError>;

    /// Serves `branch` at `/` as a Pages site, updating the source if Pages
    /// is already enabled.
    async fn enable_pages(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<(), GitHubError>;
}
