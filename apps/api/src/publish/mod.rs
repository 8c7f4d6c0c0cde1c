//! Publisher: pushes a rendered site to a GitHub repository and turns on
//! GitHub Pages for it.
//!
//! Order of operations per publish:
//! 1. create the repository, or reuse it when the name is taken
//! 2. upload every bundle file as a blob (bounded fan-out)
//! 3. tree (no base tree, so stale files disappear) → commit → force ref update
//! 4. enable Pages, retried while GitHub catches up with the new branch
//! 5. delete the local bundle
//!
//! The ref update is the only externally visible state change and always
//! comes after the tree and commit exist. Nothing is rolled back on failure:
//! blobs, trees and commits that no ref points at are inert.
//!
//! Cancellation is checked between steps. Calls already in flight finish,
//! but no later step starts, and the local bundle is kept.

pub mod bundle;
pub mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::github::{CreateRepoOutcome, Credentials, GitHost, RepoId, TreeEntry};
use crate::retry::{retry, RetryFailure, RetryPolicy};

pub use bundle::{SiteBundle, SiteFile};
pub use error::{PublishError, PublishStep};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Deploy portfolio";
/// Blob uploads in flight at once; keeps us clear of secondary rate limits.
pub const UPLOAD_CONCURRENCY: usize = 8;
pub const PAGES_RETRY: RetryPolicy = RetryPolicy::fixed(3, Duration::from_secs(2));

const MAX_REPO_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub url: String,
    pub repository_url: String,
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub commit_message: String,
    pub upload_concurrency: usize,
    pub pages_retry: RetryPolicy,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            upload_concurrency: UPLOAD_CONCURRENCY,
            pages_retry: PAGES_RETRY,
        }
    }
}

/// Repository resolved in step 1, with the commit the new one will follow.
struct Target {
    id: RepoId,
    html_url: String,
    branch: String,
    head: Option<String>,
}

pub struct Publisher {
    host: Arc<dyn GitHost>,
    options: PublishOptions,
}

impl Publisher {
    pub fn new(host: Arc<dyn GitHost>, options: PublishOptions) -> Self {
        Self { host, options }
    }

    /// Publishes the site in `local_dir` to `repo_name` under the account that
    /// owns `credentials`.
    ///
    /// On success the directory is deleted. On failure it is left untouched so
    /// the caller can retry. Once `cancel` fires, no further step is started.
    #[instrument(
        skip(self, local_dir, credentials, cancel),
        fields(local_dir = %local_dir.display())
    )]
    pub async fn publish(
        &self,
        local_dir: &Path,
        repo_name: &str,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<PublishResult, PublishError> {
        validate_repo_name(repo_name)?;
        if credentials.is_empty() {
            return Err(PublishError::InvalidInput(
                "missing GitHub credentials".to_string(),
            ));
        }

        // Enumerate before touching the remote so an empty or unreadable
        // bundle never leaves a fresh repository behind.
        let bundle = SiteBundle::open(local_dir).await?;
        let files = bundle.files().await?;
        if files.is_empty() {
            return Err(PublishError::InvalidInput(format!(
                "site directory {} contains no files",
                local_dir.display()
            )));
        }

        checkpoint(cancel, PublishStep::CreateRepository)?;
        let target = self.acquire_repository(repo_name, credentials).await?;
        info!(
            repo = %target.id,
            files = files.len(),
            reused = target.head.is_some(),
            "publishing site"
        );

        checkpoint(cancel, PublishStep::UploadBlobs)?;
        let entries = self.upload_blobs(&target.id, &files, credentials).await?;
        let commit = self
            .commit_tree(&target, &entries, credentials, cancel)
            .await?;
        info!(repo = %target.id, %commit, branch = %target.branch, "branch updated");

        checkpoint(cancel, PublishStep::EnablePages)?;
        self.activate_pages(&target, credentials).await?;

        checkpoint(cancel, PublishStep::Cleanup)?;
        if let Err(e) = bundle.remove().await {
            warn!(path = %local_dir.display(), error = %e, "failed to clean up site directory");
        }

        Ok(PublishResult {
            url: target.id.pages_url(),
            repository_url: target.html_url,
        })
    }

    async fn acquire_repository(
        &self,
        name: &str,
        credentials: &Credentials,
    ) -> Result<Target, PublishError> {
        let outcome = self
            .host
            .create_repository(credentials, name)
            .await
            .map_err(|e| PublishError::remote(PublishStep::CreateRepository, name, e))?;

        let repo = match outcome {
            CreateRepoOutcome::Created(repo) => {
                info!(repo = %repo.id(), "created repository");
                repo
            }
            CreateRepoOutcome::AlreadyExists => {
                let owner = self
                    .host
                    .authenticated_user(credentials)
                    .await
                    .map_err(|e| PublishError::remote(PublishStep::LookupRepository, name, e))?;
                let id = RepoId::new(owner, name);
                info!(repo = %id, "repository exists, replacing its contents");
                self.host
                    .get_repository(credentials, &id)
                    .await
                    .map_err(|e| PublishError::remote(PublishStep::LookupRepository, &id, e))?
            }
        };

        let id = repo.id();
        let head = self
            .host
            .branch_head(credentials, &id, &repo.default_branch)
            .await
            .map_err(|e| PublishError::remote(PublishStep::ResolveHead, &id, e))?;

        Ok(Target {
            id,
            html_url: repo.html_url,
            branch: repo.default_branch,
            head,
        })
    }

    async fn upload_blobs(
        &self,
        repo: &RepoId,
        files: &[SiteFile],
        credentials: &Credentials,
    ) -> Result<Vec<TreeEntry>, PublishError> {
        let host = self.host.as_ref();
        let mut entries: Vec<TreeEntry> = stream::iter(files.iter().cloned())
            .map(|file| async move {
                let content = tokio::fs::read(&file.absolute)
                    .await
                    .map_err(|source| PublishError::Bundle {
                        path: file.absolute.clone(),
                        source,
                    })?;
                let sha = host
                    .create_blob(credentials, repo, &content)
                    .await
                    .map_err(|e| PublishError::remote(PublishStep::UploadBlobs, repo, e))?;
                Ok::<_, PublishError>(TreeEntry::blob(file.relative, sha))
            })
            .buffer_unordered(self.options.upload_concurrency.max(1))
            .try_collect()
            .await?;

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Tree, commit, then ref. The ref only moves once both objects exist.
    async fn commit_tree(
        &self,
        target: &Target,
        entries: &[TreeEntry],
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<String, PublishError> {
        let id = &target.id;

        checkpoint(cancel, PublishStep::CreateTree)?;
        let tree = self
            .host
            .create_tree(credentials, id, entries)
            .await
            .map_err(|e| PublishError::remote(PublishStep::CreateTree, id, e))?;

        let parents: Vec<String> = target.head.iter().cloned().collect();
        let commit = self
            .host
            .create_commit(credentials, id, &self.options.commit_message, &tree, &parents)
            .await
            .map_err(|e| PublishError::remote(PublishStep::CreateCommit, id, e))?;

        checkpoint(cancel, PublishStep::UpdateRef)?;
        let moved = match target.head {
            Some(_) => {
                self.host
                    .update_ref(credentials, id, &target.branch, &commit)
                    .await
            }
            None => {
                self.host
                    .create_ref(credentials, id, &target.branch, &commit)
                    .await
            }
        };
        moved.map_err(|e| PublishError::remote(PublishStep::UpdateRef, id, e))?;

        Ok(commit)
    }

    async fn activate_pages(
        &self,
        target: &Target,
        credentials: &Credentials,
    ) -> Result<(), PublishError> {
        let host = self.host.as_ref();
        let id = &target.id;
        let branch = target.branch.as_str();

        retry(&self.options.pages_retry, "enable_pages", move |_| {
            host.enable_pages(credentials, id, branch)
        })
        .await
        .map_err(|failure| match failure {
            RetryFailure::Exhausted { attempts, error } => PublishError::ActivationTimeout {
                repository: id.clone(),
                repository_url: target.html_url.clone(),
                attempts,
                source: error,
            },
            RetryFailure::Terminal { error, .. } => {
                PublishError::remote(PublishStep::EnablePages, id, error)
            }
        })
    }
}

fn checkpoint(cancel: &CancellationToken, next: PublishStep) -> Result<(), PublishError> {
    if cancel.is_cancelled() {
        info!(%next, "publish cancelled");
        return Err(PublishError::Cancelled { step: next });
    }
    Ok(())
}

/// GitHub repository names: 1–100 characters of ASCII letters, digits,
/// `-`, `_` and `.`, and not `.` or `..`.
pub fn validate_repo_name(name: &str) -> Result<(), PublishError> {
    let invalid =
        |reason: &str| PublishError::InvalidInput(format!("invalid repository name: {reason}"));

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_REPO_NAME_LEN {
        return Err(invalid("longer than 100 characters"));
    }
    if name == "." || name == ".." {
        return Err(invalid("reserved name"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(&format!("character {c:?} is not allowed")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
