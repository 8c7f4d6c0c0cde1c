//! In-memory [`GitHost`] for tests.
//!
//! Models just enough of GitHub's object database to check what a publish
//! left behind: blobs, trees, commits, branch refs and the Pages flag, plus
//! failure injection per operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::models::Owner;
use super::{CreateRepoOutcome, Credentials, GitHost, GitHubError, RepoId, Repository, TreeEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateRepository,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
    EnablePages,
}

/// Holds a call open: `reached` fires when it starts, and it returns once
/// `release` is notified.
#[derive(Default)]
pub struct Gate {
    pub reached: Notify,
    pub release: Notify,
}

#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub tree: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeRepo {
    pub default_branch: String,
    pub blobs: HashMap<String, Vec<u8>>,
    pub trees: HashMap<String, Vec<TreeEntry>>,
    pub commits: HashMap<String, FakeCommit>,
    pub refs: HashMap<String, String>,
    pub pages_enabled: bool,
}

#[derive(Default)]
struct State {
    repos: HashMap<String, FakeRepo>,
    next_id: u64,
    failing: HashMap<Op, GitHubError>,
    pages_failures_left: u32,
    pages_calls: Vec<Instant>,
    valid_token: Option<String>,
    /// New repositories start empty instead of with a README commit.
    bare_repositories: bool,
    cancel_during: Option<(Op, CancellationToken)>,
    gates: HashMap<Op, Arc<Gate>>,
}

impl State {
    fn next_sha(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn check_token(&self, credentials: &Credentials) -> Result<(), GitHubError> {
        match &self.valid_token {
            Some(token) if token != credentials.token() => Err(GitHubError::Unauthorized {
                status: 401,
                message: "Bad credentials".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn take_failure(&mut self, op: Op) -> Result<(), GitHubError> {
        match self.failing.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Fires the registered token when `op` runs; the call itself completes.
    fn trip(&mut self, op: Op) {
        if matches!(&self.cancel_during, Some((o, _)) if *o == op) {
            if let Some((_, token)) = self.cancel_during.take() {
                token.cancel();
            }
        }
    }

    /// A repository on `main` whose single commit holds `files`.
    fn seeded_repo(&mut self, files: &[(&str, &[u8])]) -> FakeRepo {
        let mut repo = FakeRepo {
            default_branch: "main".to_string(),
            ..FakeRepo::default()
        };
        let mut entries = Vec::new();
        for (path, content) in files {
            let sha = self.next_sha("blob");
            repo.blobs.insert(sha.clone(), content.to_vec());
            entries.push(TreeEntry::blob(*path, sha));
        }
        let tree = self.next_sha("tree");
        repo.trees.insert(tree.clone(), entries);
        let commit = self.next_sha("commit");
        repo.commits.insert(
            commit.clone(),
            FakeCommit {
                tree,
                parents: vec![],
            },
        );
        repo.refs.insert("main".to_string(), commit);
        repo
    }

    fn repo_mut(&mut self, repo: &RepoId) -> Result<&mut FakeRepo, GitHubError> {
        self.repos.get_mut(&repo.name).ok_or_else(|| GitHubError::Api {
            status: 404,
            message: "Not Found".to_string(),
        })
    }
}

pub struct FakeHost {
    login: String,
    state: Mutex<State>,
}

pub fn api_error(status: u16) -> GitHubError {
    GitHubError::Api {
        status,
        message: format!("injected {status}"),
    }
}

impl FakeHost {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Only `token` is accepted from now on.
    pub fn require_token(self, token: &str) -> Self {
        self.state.lock().unwrap().valid_token = Some(token.to_string());
        self
    }

    /// Seeds a repository whose `main` branch holds `files`.
    pub fn with_repo(self, name: &str, files: &[(&str, &[u8])]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let repo = state.seeded_repo(files);
            state.repos.insert(name.to_string(), repo);
        }
        self
    }

    /// Created repositories have no commits and no branch.
    pub fn bare_repositories(self) -> Self {
        self.state.lock().unwrap().bare_repositories = true;
        self
    }

    /// Cancels `token` while `op` is being served.
    pub fn cancel_during(&self, op: Op, token: CancellationToken) {
        self.state.lock().unwrap().cancel_during = Some((op, token));
    }

    /// The next call to `op` fails with `error`.
    pub fn fail_next(&self, op: Op, error: GitHubError) {
        self.state.lock().unwrap().failing.insert(op, error);
    }

    /// The next `count` Pages requests fail with a propagation-style 404.
    pub fn fail_pages(&self, count: u32) {
        self.state.lock().unwrap().pages_failures_left = count;
    }

    /// The next `create_commit` waits on the returned gate before running.
    pub fn pause_commit(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(Op::CreateCommit, gate.clone());
        gate
    }

    async fn wait_at(&self, op: Op) {
        let gate = self.state.lock().unwrap().gates.remove(&op);
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
    }

    pub fn pages_calls(&self) -> Vec<Instant> {
        self.state.lock().unwrap().pages_calls.clone()
    }

    pub fn repo_count(&self) -> usize {
        self.state.lock().unwrap().repos.len()
    }

    pub fn head(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let repo = state.repos.get(name)?;
        repo.refs.get(&repo.default_branch).cloned()
    }

    pub fn commit(&self, name: &str, sha: &str) -> Option<FakeCommit> {
        let state = self.state.lock().unwrap();
        state.repos.get(name)?.commits.get(sha).cloned()
    }

    pub fn commit_count(&self, name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.repos.get(name).map_or(0, |r| r.commits.len())
    }

    pub fn pages_enabled(&self, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.repos.get(name).is_some_and(|r| r.pages_enabled)
    }

    /// Files visible at the branch head: path → content.
    pub fn files_at_head(&self, name: &str) -> BTreeMap<String, Vec<u8>> {
        let state = self.state.lock().unwrap();
        let Some(repo) = state.repos.get(name) else {
            return BTreeMap::new();
        };
        let Some(commit) = repo
            .refs
            .get(&repo.default_branch)
            .and_then(|sha| repo.commits.get(sha))
        else {
            return BTreeMap::new();
        };
        repo.trees
            .get(&commit.tree)
            .into_iter()
            .flatten()
            .filter_map(|e| {
                repo.blobs
                    .get(&e.sha)
                    .map(|content| (e.path.clone(), content.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl GitHost for FakeHost {
    async fn authenticated_user(&self, credentials: &Credentials) -> Result<String, GitHubError> {
        self.state.lock().unwrap().check_token(credentials)?;
        Ok(self.login.clone())
    }

    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &str,
    ) -> Result<CreateRepoOutcome, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::CreateRepository)?;
        state.trip(Op::CreateRepository);
        if state.repos.contains_key(name) {
            return Ok(CreateRepoOutcome::AlreadyExists);
        }
        let repo = if state.bare_repositories {
            FakeRepo {
                default_branch: "main".to_string(),
                ..FakeRepo::default()
            }
        } else {
            let readme: &[(&str, &[u8])] = &[("README.md", b"# Portfolio\n")];
            state.seeded_repo(readme)
        };
        state.repos.insert(name.to_string(), repo);
        Ok(CreateRepoOutcome::Created(self.repository(name)))
    }

    async fn get_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
    ) -> Result<Repository, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.repo_mut(repo)?;
        Ok(self.repository(&repo.name))
    }

    async fn branch_head(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<String>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        Ok(state.repo_mut(repo)?.refs.get(branch).cloned())
    }

    async fn create_blob(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        content: &[u8],
    ) -> Result<String, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::CreateBlob)?;
        state.trip(Op::CreateBlob);
        let sha = state.next_sha("blob");
        state
            .repo_mut(repo)?
            .blobs
            .insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        entries: &[TreeEntry],
    ) -> Result<String, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::CreateTree)?;
        state.trip(Op::CreateTree);
        let sha = state.next_sha("tree");
        let target = state.repo_mut(repo)?;
        if let Some(missing) = entries.iter().find(|e| !target.blobs.contains_key(&e.sha)) {
            return Err(GitHubError::Api {
                status: 422,
                message: format!("unknown blob {}", missing.sha),
            });
        }
        target.trees.insert(sha.clone(), entries.to_vec());
        Ok(sha)
    }

    async fn create_commit(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        _message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, GitHubError> {
        self.wait_at(Op::CreateCommit).await;
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::CreateCommit)?;
        state.trip(Op::CreateCommit);
        let sha = state.next_sha("commit");
        state.repo_mut(repo)?.commits.insert(
            sha.clone(),
            FakeCommit {
                tree: tree.to_string(),
                parents: parents.to_vec(),
            },
        );
        Ok(sha)
    }

    async fn create_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::UpdateRef)?;
        state.trip(Op::UpdateRef);
        let target = state.repo_mut(repo)?;
        if target.refs.contains_key(branch) {
            return Err(GitHubError::Api {
                status: 422,
                message: "Reference already exists".to_string(),
            });
        }
        target.refs.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn update_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.take_failure(Op::UpdateRef)?;
        state.trip(Op::UpdateRef);
        state
            .repo_mut(repo)?
            .refs
            .insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn enable_pages(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.check_token(credentials)?;
        state.pages_calls.push(Instant::now());
        state.trip(Op::EnablePages);
        if state.pages_failures_left > 0 {
            state.pages_failures_left -= 1;
            return Err(api_error(404));
        }
        let target = state.repo_mut(repo)?;
        if !target.refs.contains_key(branch) {
            return Err(api_error(422));
        }
        target.pages_enabled = true;
        Ok(())
    }
}

impl FakeHost {
    fn repository(&self, name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            owner: Owner {
                login: self.login.clone(),
            },
            html_url: format!("https://github.com/{}/{name}", self.login),
            default_branch: "main".to_string(),
        }
    }
}
