use std::fmt;

use serde::{Deserialize, Serialize};

/// Mode for a regular, non-executable file in a git tree.
pub const FILE_MODE: &str = "100644";

/// (owner, name) pair identifying a repository on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Public GitHub Pages address for a project site.
    pub fn pages_url(&self) -> String {
        format!("https://{}.github.io/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
    pub html_url: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Repository {
    pub fn id(&self) -> RepoId {
        RepoId::new(&self.owner.login, &self.name)
    }
}

fn default_branch() -> String {
    "main".to_string()
}

/// Result of asking the host to create a repository.
///
/// A name collision is an expected outcome, not an error: the publisher
/// switches to reusing the existing repository.
#[derive(Debug, Clone)]
pub enum CreateRepoOutcome {
    Created(Repository),
    AlreadyExists,
}

/// One `(path, mode, blob)` line of a git tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_string(),
            kind: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepoRequest<'a> {
    pub name: &'a str,
    pub auto_init: bool,
    pub private: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBlobRequest {
    pub content: String,
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTreeRequest<'a> {
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRefRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct PagesRequest<'a> {
    pub source: PagesSource<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PagesSource<'a> {
    pub branch: &'a str,
    pub path: &'a str,
}

/// Any git object response: blobs, trees and commits all carry a `sha`.
#[derive(Debug, Deserialize)]
pub(crate) struct ShaResponse {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefResponse {
    pub object: ShaResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub login: String,
}
