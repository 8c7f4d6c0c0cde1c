use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::github::{GitHubError, RepoId};

/// The remote call a publish was making when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    CreateRepository,
    LookupRepository,
    ResolveHead,
    UploadBlobs,
    CreateTree,
    CreateCommit,
    UpdateRef,
    EnablePages,
    Cleanup,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::CreateRepository => "repository creation",
            PublishStep::LookupRepository => "repository lookup",
            PublishStep::ResolveHead => "branch head lookup",
            PublishStep::UploadBlobs => "blob upload",
            PublishStep::CreateTree => "tree creation",
            PublishStep::CreateCommit => "commit creation",
            PublishStep::UpdateRef => "ref update",
            PublishStep::EnablePages => "pages activation",
            PublishStep::Cleanup => "site cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credentials rejected during {step}: {source}")]
    Authorization {
        step: PublishStep,
        #[source]
        source: GitHubError,
    },

    #[error("{step} failed for {repository}: {source}")]
    RemoteService {
        step: PublishStep,
        /// `owner/name` once known, the bare name before that.
        repository: String,
        #[source]
        source: GitHubError,
    },

    /// Content is committed and live on the branch; only Pages is unconfirmed.
    #[error("pages activation for {repository} failed after {attempts} attempts: {source}")]
    ActivationTimeout {
        repository: RepoId,
        repository_url: String,
        attempts: u32,
        #[source]
        source: GitHubError,
    },

    /// The caller went away. `step` and everything after it were skipped.
    #[error("publish cancelled before {step}")]
    Cancelled { step: PublishStep },

    #[error("failed to read site bundle at {path}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Wraps a host error with the step and repository it happened on.
    pub(crate) fn remote(
        step: PublishStep,
        repository: impl fmt::Display,
        source: GitHubError,
    ) -> Self {
        match source {
            GitHubError::Unauthorized { .. } => PublishError::Authorization { step, source },
            source => PublishError::RemoteService {
                step,
                repository: repository.to_string(),
                source,
            },
        }
    }
}
