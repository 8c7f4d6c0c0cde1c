//! GitHub REST client. The only place in the service that talks to the
//! GitHub API.
//!
//! Implements [`GitHost`] on top of the git database endpoints (blobs, trees,
//! commits, refs) and the Pages endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::models::{
    CreateBlobRequest, CreateCommitRequest, CreateRefRequest, CreateRepoRequest,
    CreateTreeRequest, PagesRequest, PagesSource, RefResponse, ShaResponse, UpdateRefRequest,
    UserResponse,
};
use super::{CreateRepoOutcome, Credentials, GitHost, GitHubError, RepoId, Repository, TreeEntry};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    /// GitHub mixes objects and bare strings in this array.
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl ApiErrorBody {
    fn name_already_exists(&self) -> bool {
        self.errors.iter().any(|e| {
            let field = e.get("field").and_then(|f| f.as_str());
            let code = e.get("code").and_then(|c| c.as_str());
            let message = e.get("message").and_then(|m| m.as_str()).unwrap_or_default();
            code == Some("already_exists")
                || (field == Some("name") && message.contains("already exists"))
        })
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, credentials: &Credentials) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_url))
            .bearer_auth(credentials.token())
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GitHubError> {
        let response = ensure_success(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), GitHubError> {
        ensure_success(request.send().await?).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into a [`GitHubError`]. The raw body stays in the
/// error for logs; handlers never forward it to end users.
async fn ensure_success(response: Response) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");
    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &body, rate_limited))
}

fn error_from_body(status: StatusCode, body: &str, rate_limited: bool) -> GitHubError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string());

    // An exhausted rate limit comes back as 403 but is transient.
    if rate_limited {
        return GitHubError::Api {
            status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
            message,
        };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GitHubError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => GitHubError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn authenticated_user(&self, credentials: &Credentials) -> Result<String, GitHubError> {
        let user: UserResponse =
            Self::send_json(self.request(Method::GET, "/user", credentials)).await?;
        Ok(user.login)
    }

    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &str,
    ) -> Result<CreateRepoOutcome, GitHubError> {
        // auto_init gives the repository a first commit; the git database
        // endpoints reject empty repositories.
        let response = self
            .request(Method::POST, "/user/repos", credentials)
            .json(&CreateRepoRequest {
                name,
                auto_init: true,
                private: false,
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(&body) {
                if parsed.name_already_exists() {
                    debug!(repo = name, "repository already exists");
                    return Ok(CreateRepoOutcome::AlreadyExists);
                }
            }
            return Err(error_from_body(StatusCode::UNPROCESSABLE_ENTITY, &body, false));
        }

        let repo: Repository = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        Ok(CreateRepoOutcome::Created(repo))
    }

    async fn get_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
    ) -> Result<Repository, GitHubError> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        Self::send_json(self.request(Method::GET, &path, credentials)).await
    }

    async fn branch_head(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<String>, GitHubError> {
        let path = format!("/repos/{}/{}/git/ref/heads/{branch}", repo.owner, repo.name);
        let response = self.request(Method::GET, &path, credentials).send().await?;

        // 404: no such branch yet. 409: "Git Repository is empty."
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::CONFLICT
        ) {
            return Ok(None);
        }

        let reference: RefResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        Ok(Some(reference.object.sha))
    }

    async fn create_blob(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        content: &[u8],
    ) -> Result<String, GitHubError> {
        let path = format!("/repos/{}/{}/git/blobs", repo.owner, repo.name);
        let blob: ShaResponse = Self::send_json(
            self.request(Method::POST, &path, credentials)
                .json(&CreateBlobRequest {
                    content: STANDARD.encode(content),
                    encoding: "base64",
                }),
        )
        .await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        entries: &[TreeEntry],
    ) -> Result<String, GitHubError> {
        let path = format!("/repos/{}/{}/git/trees", repo.owner, repo.name);
        let tree: ShaResponse = Self::send_json(
            self.request(Method::POST, &path, credentials)
                .json(&CreateTreeRequest { tree: entries }),
        )
        .await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, GitHubError> {
        let path = format!("/repos/{}/{}/git/commits", repo.owner, repo.name);
        let commit: ShaResponse = Self::send_json(
            self.request(Method::POST, &path, credentials)
                .json(&CreateCommitRequest {
                    message,
                    tree,
                    parents,
                }),
        )
        .await?;
        Ok(commit.sha)
    }

    async fn create_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
        Self::send_empty(
            self.request(Method::POST, &path, credentials)
                .json(&CreateRefRequest {
                    reference: format!("refs/heads/{branch}"),
                    sha: sha.to_string(),
                }),
        )
        .await
    }

    async fn update_ref(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/git/refs/heads/{branch}", repo.owner, repo.name);
        Self::send_empty(
            self.request(Method::PATCH, &path, credentials)
                .json(&UpdateRefRequest { sha, force: true }),
        )
        .await
    }

    async fn enable_pages(
        &self,
        credentials: &Credentials,
        repo: &RepoId,
        branch: &str,
    ) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/pages", repo.owner, repo.name);
        let body = PagesRequest {
            source: PagesSource { branch, path: "/" },
        };

        let response = self
            .request(Method::POST, &path, credentials)
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            // Pages already enabled from an earlier deploy: repoint the source.
            warn!(repo = %repo, "pages already enabled, updating source");
            return Self::send_empty(self.request(Method::PUT, &path, credentials).json(&body))
                .await;
        }

        ensure_success(response).await?;
        Ok(())
    }
}
