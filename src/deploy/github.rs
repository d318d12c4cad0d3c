//! Repository provider client.
//!
//! Every operation is idempotent: ensuring a repository or a site
//! configuration that already exists is a read, and file writes carry the
//! version token read immediately before them.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::GitHubConfig;
use crate::errors::RemoteError;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "pagesmith";
const REPO_DESCRIPTION: &str = "Auto-generated by pagesmith";
/// Site publishing builds from the output of the Pages workflow.
const WORKFLOW_BUILD_TYPE: &str = "workflow";
/// Longest error body kept in a [`RemoteError`].
const MAX_ERROR_BODY: usize = 512;

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Format check only; it does not verify the token is active or scoped.
pub fn is_valid_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    GITHUB_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// A repository addressed by owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Public web URL of the repository.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

/// A GitHub repository (subset of fields we care about).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub name: String,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub default_branch: String,
}

/// Result of [`RepositoryHost::ensure_repository`].
#[derive(Debug, Clone)]
pub struct EnsuredRepository {
    pub repository: Repository,
    pub created: bool,
}

/// Outcome of reconciling the site-publishing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitePublishing {
    Created,
    AlreadyConfigured,
    Updated,
    /// The configuration exists with the wrong build source and could not be changed.
    UpdateFailed { reason: String },
    /// The current configuration could not be read; nothing was changed.
    LookupFailed { reason: String },
}

impl SitePublishing {
    /// Whether the reconciliation fell short without being fatal.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            SitePublishing::UpdateFailed { .. } | SitePublishing::LookupFailed { .. }
        )
    }
}

#[derive(Debug, Deserialize)]
struct PagesSite {
    #[serde(default)]
    build_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentMetadata {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutFileResponse {
    commit: CommitRef,
}

/// Operations the publish pipeline needs from a repository provider.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Look the repository up and create it (public, auto-initialized) if absent.
    async fn ensure_repository(&self, repo: &RepoRef) -> Result<EnsuredRepository, RemoteError>;

    /// Grant CI-issued tokens write access by default.
    async fn set_workflow_write_permissions(&self, repo: &RepoRef) -> Result<(), RemoteError>;

    /// Make the site build from workflow output. Only a failed create is an `Err`.
    async fn ensure_site_publishing(&self, repo: &RepoRef) -> Result<SitePublishing, RemoteError>;

    /// Current version token of `path`, or `None` if the file does not exist.
    async fn get_file_version(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, RemoteError>;

    /// Create or update `path` on the default branch and return the commit id.
    async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        version: Option<&str>,
    ) -> Result<String, RemoteError>;

    /// Id of the newest commit on the default branch.
    async fn get_latest_commit(&self, repo: &RepoRef) -> Result<String, RemoteError>;
}

/// REST client for the GitHub API.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    async fn send(
        &self,
        operation: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        builder
            .send()
            .await
            .map_err(|source| RemoteError::Transport { operation, source })
    }
}

fn repo_path(repo: &RepoRef) -> String {
    format!(
        "/repos/{}/{}",
        urlencoding::encode(&repo.owner),
        urlencoding::encode(&repo.name)
    )
}

/// Contents URL path for `path`, encoding each segment on its own.
fn contents_path(repo: &RepoRef, path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/contents/{}", repo_path(repo), encoded)
}

async fn unexpected_status(operation: &'static str, response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    RemoteError::UnexpectedStatus {
        operation,
        status,
        body,
    }
}

async fn expect_success(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(unexpected_status(operation, response).await)
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    response.json::<T>().await.map_err(|e| RemoteError::Decode {
        operation,
        message: e.to_string(),
    })
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn ensure_repository(&self, repo: &RepoRef) -> Result<EnsuredRepository, RemoteError> {
        const OP: &str = "ensure_repository";
        let response = self.send(OP, self.request(Method::GET, &repo_path(repo))).await?;

        if response.status() != StatusCode::NOT_FOUND {
            let response = expect_success(OP, response).await?;
            return Ok(EnsuredRepository {
                repository: decode(OP, response).await?,
                created: false,
            });
        }

        let body = json!({
            "name": repo.name,
            "private": false,
            "auto_init": true,
            "description": REPO_DESCRIPTION,
        });
        let response = self
            .send(OP, self.request(Method::POST, "/user/repos").json(&body))
            .await?;
        let response = expect_success(OP, response).await?;
        tracing::info!(repo = %repo.full_name(), "Created repository");
        Ok(EnsuredRepository {
            repository: decode(OP, response).await?,
            created: true,
        })
    }

    async fn set_workflow_write_permissions(&self, repo: &RepoRef) -> Result<(), RemoteError> {
        const OP: &str = "set_workflow_write_permissions";
        let path = format!("{}/actions/permissions/workflow", repo_path(repo));
        let body = json!({
            "default_workflow_permissions": "write",
            "can_approve_pull_request_reviews": false,
        });
        let response = self.send(OP, self.request(Method::PUT, &path).json(&body)).await?;
        expect_success(OP, response).await?;
        Ok(())
    }

    async fn ensure_site_publishing(&self, repo: &RepoRef) -> Result<SitePublishing, RemoteError> {
        const OP: &str = "ensure_site_publishing";
        let path = format!("{}/pages", repo_path(repo));
        let desired = json!({ "build_type": WORKFLOW_BUILD_TYPE });

        let lookup = match self.send(OP, self.request(Method::GET, &path)).await {
            Ok(response) => response,
            Err(e) => return Ok(SitePublishing::LookupFailed { reason: e.to_string() }),
        };

        if lookup.status() == StatusCode::NOT_FOUND {
            let response = self.send(OP, self.request(Method::POST, &path).json(&desired)).await?;
            expect_success(OP, response).await?;
            return Ok(SitePublishing::Created);
        }

        let site: PagesSite = match expect_success(OP, lookup).await {
            Ok(response) => match decode(OP, response).await {
                Ok(site) => site,
                Err(e) => return Ok(SitePublishing::LookupFailed { reason: e.to_string() }),
            },
            Err(e) => return Ok(SitePublishing::LookupFailed { reason: e.to_string() }),
        };

        if site.build_type.as_deref() == Some(WORKFLOW_BUILD_TYPE) {
            return Ok(SitePublishing::AlreadyConfigured);
        }

        let update = match self.send(OP, self.request(Method::PUT, &path).json(&desired)).await {
            Ok(response) => expect_success(OP, response).await,
            Err(e) => Err(e),
        };
        Ok(match update {
            Ok(_) => SitePublishing::Updated,
            Err(e) => SitePublishing::UpdateFailed { reason: e.to_string() },
        })
    }

    async fn get_file_version(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, RemoteError> {
        const OP: &str = "get_file_version";
        let response = self
            .send(OP, self.request(Method::GET, &contents_path(repo, path)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(OP, response).await?;
        let metadata: ContentMetadata = decode(OP, response).await?;
        Ok(Some(metadata.sha))
    }

    async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        version: Option<&str>,
    ) -> Result<String, RemoteError> {
        const OP: &str = "put_file";
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
        });
        if let Some(sha) = version {
            body["sha"] = json!(sha);
        }
        let response = self
            .send(OP, self.request(Method::PUT, &contents_path(repo, path)).json(&body))
            .await?;
        let response = expect_success(OP, response).await?;
        let written: PutFileResponse = decode(OP, response).await?;
        Ok(written.commit.sha)
    }

    async fn get_latest_commit(&self, repo: &RepoRef) -> Result<String, RemoteError> {
        const OP: &str = "get_latest_commit";
        let path = format!("{}/commits", repo_path(repo));
        let response = self
            .send(OP, self.request(Method::GET, &path).query(&[("per_page", "1")]))
            .await?;
        let response = expect_success(OP, response).await?;
        let commits: Vec<CommitRef> = decode(OP, response).await?;
        commits
            .into_iter()
            .next()
            .map(|c| c.sha)
            .ok_or(RemoteError::Decode {
                operation: OP,
                message: "repository has no commits".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::test_support::{spawn_server, unused_url};
    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, Uri};
    use axum::response::{IntoResponse, Response};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        query: Option<String>,
        headers: HeaderMap,
        body: Value,
    }

    /// Fake provider answering `"METHOD /path"` with canned responses.
    #[derive(Clone, Default)]
    struct Scripted {
        routes: Arc<Mutex<HashMap<String, (u16, Value)>>>,
        log: Arc<Mutex<Vec<Recorded>>>,
    }

    impl Scripted {
        fn on(&self, route: &str, status: u16, body: Value) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .insert(route.to_string(), (status, body));
            self
        }

        fn requests(&self) -> Vec<Recorded> {
            self.log.lock().unwrap().clone()
        }

        fn routes_hit(&self) -> Vec<String> {
            self.requests()
                .iter()
                .map(|r| format!("{} {}", r.method, r.path))
                .collect()
        }
    }

    async fn scripted_handler(
        State(fake): State<Scripted>,
        method: axum::http::Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let key = format!("{} {}", method, uri.path());
        fake.log.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        let (status, value) = fake
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or((404, json!({"message": "Not Found"})));
        let status = axum::http::StatusCode::from_u16(status).unwrap();
        if value.is_null() {
            status.into_response()
        } else {
            (status, axum::Json(value)).into_response()
        }
    }

    async fn client_for(fake: &Scripted) -> GitHubClient {
        let router = Router::new()
            .fallback(scripted_handler)
            .with_state(fake.clone());
        let base = spawn_server(router).await;
        client_at(base)
    }

    fn client_at(api_url: String) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            token: "ghp_test".to_string(),
            owner: "octo".to_string(),
            api_url,
            pages_base_url: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn repo() -> RepoRef {
        RepoRef::new("octo", "demo-1")
    }

    fn repo_json() -> Value {
        json!({
            "full_name": "octo/demo-1",
            "name": "demo-1",
            "private": false,
            "html_url": "https://github.com/octo/demo-1",
            "description": null,
            "default_branch": "main"
        })
    }

    // ── is_valid_github_token ────────────────────────────────────────

    #[test]
    fn test_known_token_prefixes_are_valid() {
        for token in ["ghp_abc", "github_pat_abc", "gho_a", "ghu_a", "ghs_a", "ghr_a"] {
            assert!(is_valid_github_token(token), "{}", token);
        }
    }

    #[test]
    fn test_unknown_or_empty_token_is_invalid() {
        assert!(!is_valid_github_token(""));
        assert!(!is_valid_github_token("not-a-token"));
        assert!(!is_valid_github_token("GHP_abc123"));
        assert!(!is_valid_github_token(" ghp_abc123"));
    }

    // ── URL building ─────────────────────────────────────────────────

    #[test]
    fn test_repo_ref_urls() {
        assert_eq!(repo().full_name(), "octo/demo-1");
        assert_eq!(repo().html_url(), "https://github.com/octo/demo-1");
    }

    #[test]
    fn test_contents_path_encodes_each_segment() {
        assert_eq!(
            contents_path(&repo(), "assets/my file#1.png"),
            "/repos/octo/demo-1/contents/assets/my%20file%231.png"
        );
        assert_eq!(
            contents_path(&repo(), ".github/workflows/pages.yml"),
            "/repos/octo/demo-1/contents/.github/workflows/pages.yml"
        );
    }

    // ── Repository deserialization ───────────────────────────────────

    #[test]
    fn test_repository_deserialize_ignores_extra_fields() {
        let mut value = repo_json();
        value["clone_url"] = json!("https://github.com/octo/demo-1.git");
        let repository: Repository = serde_json::from_value(value).unwrap();
        assert_eq!(repository.full_name, "octo/demo-1");
        assert!(!repository.private);
        assert!(repository.description.is_none());
        assert_eq!(repository.default_branch, "main");
    }

    // ── ensure_repository ────────────────────────────────────────────

    #[tokio::test]
    async fn test_ensure_repository_existing_is_a_read() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1", 200, repo_json());
        let client = client_for(&fake).await;

        let ensured = client.ensure_repository(&repo()).await.unwrap();
        assert!(!ensured.created);
        assert_eq!(ensured.repository.name, "demo-1");
        assert_eq!(fake.routes_hit(), vec!["GET /repos/octo/demo-1"]);
    }

    #[tokio::test]
    async fn test_ensure_repository_creates_when_missing() {
        let fake = Scripted::default();
        fake.on("POST /user/repos", 201, repo_json());
        let client = client_for(&fake).await;

        let ensured = client.ensure_repository(&repo()).await.unwrap();
        assert!(ensured.created);

        let requests = fake.requests();
        assert_eq!(requests.len(), 2);
        let create = &requests[1];
        assert_eq!(create.path, "/user/repos");
        assert_eq!(create.body["name"], "demo-1");
        assert_eq!(create.body["private"], false);
        assert_eq!(create.body["auto_init"], true);
    }

    #[tokio::test]
    async fn test_ensure_repository_other_status_is_fatal() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1", 500, json!({"message": "boom"}));
        let client = client_for(&fake).await;

        let err = client.ensure_repository(&repo()).await.unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 500, .. }));
        assert_eq!(err.operation(), "ensure_repository");
    }

    #[tokio::test]
    async fn test_requests_carry_provider_headers() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1", 200, repo_json());
        let client = client_for(&fake).await;
        client.ensure_repository(&repo()).await.unwrap();

        let headers = &fake.requests()[0].headers;
        assert_eq!(headers["authorization"], "Bearer ghp_test");
        assert_eq!(headers["accept"], GITHUB_ACCEPT);
        assert_eq!(headers["x-github-api-version"], GITHUB_API_VERSION);
        assert_eq!(headers["user-agent"], USER_AGENT);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let client = client_at(unused_url().await);
        let err = client.ensure_repository(&repo()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }));
    }

    // ── permissions ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_set_workflow_write_permissions() {
        let fake = Scripted::default();
        fake.on("PUT /repos/octo/demo-1/actions/permissions/workflow", 204, Value::Null);
        let client = client_for(&fake).await;

        client.set_workflow_write_permissions(&repo()).await.unwrap();
        assert_eq!(fake.requests()[0].body["default_workflow_permissions"], "write");
    }

    #[tokio::test]
    async fn test_set_workflow_write_permissions_forbidden() {
        let fake = Scripted::default();
        fake.on(
            "PUT /repos/octo/demo-1/actions/permissions/workflow",
            403,
            json!({"message": "Resource not accessible"}),
        );
        let client = client_for(&fake).await;
        let err = client.set_workflow_write_permissions(&repo()).await.unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 403, .. }));
    }

    // ── site publishing ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_site_publishing_created_when_absent() {
        let fake = Scripted::default();
        fake.on("POST /repos/octo/demo-1/pages", 201, json!({"build_type": "workflow"}));
        let client = client_for(&fake).await;

        let outcome = client.ensure_site_publishing(&repo()).await.unwrap();
        assert_eq!(outcome, SitePublishing::Created);
        assert_eq!(fake.requests()[1].body["build_type"], "workflow");
    }

    #[tokio::test]
    async fn test_site_publishing_already_configured() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/pages", 200, json!({"build_type": "workflow"}));
        let client = client_for(&fake).await;

        let outcome = client.ensure_site_publishing(&repo()).await.unwrap();
        assert_eq!(outcome, SitePublishing::AlreadyConfigured);
        assert_eq!(fake.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_site_publishing_wrong_source_is_updated() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/pages", 200, json!({"build_type": "legacy"}));
        fake.on("PUT /repos/octo/demo-1/pages", 204, Value::Null);
        let client = client_for(&fake).await;

        let outcome = client.ensure_site_publishing(&repo()).await.unwrap();
        assert_eq!(outcome, SitePublishing::Updated);
    }

    #[tokio::test]
    async fn test_site_publishing_update_failure_is_not_an_error() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/pages", 200, json!({"build_type": "legacy"}));
        fake.on("PUT /repos/octo/demo-1/pages", 422, json!({"message": "invalid"}));
        let client = client_for(&fake).await;

        let outcome = client.ensure_site_publishing(&repo()).await.unwrap();
        assert!(matches!(outcome, SitePublishing::UpdateFailed { .. }));
        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_site_publishing_lookup_failure_is_not_an_error() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/pages", 500, json!({"message": "boom"}));
        let client = client_for(&fake).await;

        let outcome = client.ensure_site_publishing(&repo()).await.unwrap();
        assert!(matches!(outcome, SitePublishing::LookupFailed { .. }));
        assert_eq!(fake.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_site_publishing_create_failure_is_an_error() {
        let fake = Scripted::default();
        fake.on("POST /repos/octo/demo-1/pages", 422, json!({"message": "no main branch"}));
        let client = client_for(&fake).await;

        let err = client.ensure_site_publishing(&repo()).await.unwrap_err();
        assert!(matches!(err, RemoteError::UnexpectedStatus { status: 422, .. }));
    }

    // ── contents ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_file_version_absent_and_present() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/contents/index.html", 200, json!({"sha": "v1"}));
        let client = client_for(&fake).await;

        assert_eq!(
            client.get_file_version(&repo(), "index.html").await.unwrap(),
            Some("v1".to_string())
        );
        assert_eq!(client.get_file_version(&repo(), "missing.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_file_version_server_error_is_remote_error() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/contents/index.html", 502, json!({}));
        let client = client_for(&fake).await;
        assert!(client.get_file_version(&repo(), "index.html").await.is_err());
    }

    #[tokio::test]
    async fn test_put_file_sends_content_and_version() {
        let fake = Scripted::default();
        fake.on(
            "PUT /repos/octo/demo-1/contents/docs/read%20me.md",
            200,
            json!({"content": {"sha": "blob"}, "commit": {"sha": "c0ffee"}}),
        );
        let client = client_for(&fake).await;

        let sha = client
            .put_file(&repo(), "docs/read me.md", b"hello", "[demo-1] Update docs/read me.md", Some("v1"))
            .await
            .unwrap();
        assert_eq!(sha, "c0ffee");

        let body = &fake.requests()[0].body;
        assert_eq!(body["content"], "aGVsbG8=");
        assert_eq!(body["sha"], "v1");
        assert_eq!(body["message"], "[demo-1] Update docs/read me.md");
    }

    #[tokio::test]
    async fn test_put_file_without_version_omits_sha() {
        let fake = Scripted::default();
        fake.on(
            "PUT /repos/octo/demo-1/contents/LICENSE",
            201,
            json!({"commit": {"sha": "abc"}}),
        );
        let client = client_for(&fake).await;

        client
            .put_file(&repo(), "LICENSE", b"MIT", "[demo-1] Add LICENSE", None)
            .await
            .unwrap();
        assert!(fake.requests()[0].body.get("sha").is_none());
    }

    #[tokio::test]
    async fn test_put_file_conflict_is_fatal() {
        let fake = Scripted::default();
        fake.on(
            "PUT /repos/octo/demo-1/contents/index.html",
            409,
            json!({"message": "index.html does not match"}),
        );
        let client = client_for(&fake).await;

        let err = client
            .put_file(&repo(), "index.html", b"x", "m", Some("stale"))
            .await
            .unwrap_err();
        match err {
            RemoteError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 409);
                assert!(body.contains("does not match"));
            }
            other => panic!("Expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_put_file_missing_commit_is_decode_error() {
        let fake = Scripted::default();
        fake.on("PUT /repos/octo/demo-1/contents/a.txt", 200, json!({"content": {}}));
        let client = client_for(&fake).await;

        let err = client.put_file(&repo(), "a.txt", b"x", "m", None).await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode { operation: "put_file", .. }));
    }

    // ── commits ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_latest_commit() {
        let fake = Scripted::default();
        fake.on(
            "GET /repos/octo/demo-1/commits",
            200,
            json!([{"sha": "newest"}, {"sha": "older"}]),
        );
        let client = client_for(&fake).await;

        assert_eq!(client.get_latest_commit(&repo()).await.unwrap(), "newest");
        assert_eq!(fake.requests()[0].query.as_deref(), Some("per_page=1"));
    }

    #[tokio::test]
    async fn test_get_latest_commit_empty_history() {
        let fake = Scripted::default();
        fake.on("GET /repos/octo/demo-1/commits", 200, json!([]));
        let client = client_for(&fake).await;
        assert!(matches!(
            client.get_latest_commit(&repo()).await.unwrap_err(),
            RemoteError::Decode { .. }
        ));
    }
}
