//! Test doubles shared by the deploy tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use super::generator::AppGenerator;
use super::github::{EnsuredRepository, RepoRef, Repository, RepositoryHost, SitePublishing};
use super::models::PublishResult;
use super::notifier::{Delivery, ResultNotifier};
use super::poller::Reachability;
use crate::errors::RemoteError;

/// Serve `router` on a dynamic localhost port and return its base URL.
pub(crate) async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("test server address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub(crate) async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind unused listener");
    let addr = listener.local_addr().expect("local address");
    drop(listener);
    format!("http://{}", addr)
}

/// How the fake provider answers site-publishing reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum FakeSite {
    #[default]
    Absent,
    Configured,
    Legacy,
    LookupFails,
    CreateFails,
    UpdateFails,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub repos: BTreeSet<String>,
    /// `owner/name/path` → (content, version token)
    pub files: BTreeMap<String, (Vec<u8>, String)>,
    pub calls: Vec<String>,
    pub commits: u32,
    pub site: FakeSite,
    pub fail_ensure: bool,
    pub fail_permissions: bool,
    pub fail_latest: bool,
    pub fail_put_path: Option<String>,
}

/// In-memory provider that enforces version tokens on writes.
#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn with(configure: impl FnOnce(&mut FakeState)) -> Self {
        let host = Self::default();
        configure(&mut host.state.lock().unwrap());
        host
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Paths passed to `put_file`, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix("put_file ").map(str::to_string))
            .collect()
    }

    pub fn file(&self, repo: &RepoRef, path: &str) -> Option<Vec<u8>> {
        let key = format!("{}/{}", repo.full_name(), path);
        self.state
            .lock()
            .unwrap()
            .files
            .get(&key)
            .map(|(content, _)| content.clone())
    }

    pub fn has_remote_side_effects(&self) -> bool {
        !self.calls().is_empty()
    }
}

fn status(operation: &'static str, status: u16) -> RemoteError {
    RemoteError::UnexpectedStatus {
        operation,
        status,
        body: "injected".to_string(),
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn ensure_repository(&self, repo: &RepoRef) -> Result<EnsuredRepository, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("ensure_repository {}", repo.full_name()));
        if state.fail_ensure {
            return Err(status("ensure_repository", 500));
        }
        let created = state.repos.insert(repo.full_name());
        Ok(EnsuredRepository {
            repository: Repository {
                full_name: repo.full_name(),
                name: repo.name.clone(),
                private: false,
                html_url: repo.html_url(),
                description: None,
                default_branch: "main".to_string(),
            },
            created,
        })
    }

    async fn set_workflow_write_permissions(&self, repo: &RepoRef) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("set_workflow_write_permissions {}", repo.full_name()));
        if state.fail_permissions {
            return Err(status("set_workflow_write_permissions", 403));
        }
        Ok(())
    }

    async fn ensure_site_publishing(&self, repo: &RepoRef) -> Result<SitePublishing, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("ensure_site_publishing {}", repo.full_name()));
        let site = state.site;
        match site {
            FakeSite::Absent => {
                state.site = FakeSite::Configured;
                Ok(SitePublishing::Created)
            }
            FakeSite::Configured => Ok(SitePublishing::AlreadyConfigured),
            FakeSite::Legacy => {
                state.site = FakeSite::Configured;
                Ok(SitePublishing::Updated)
            }
            FakeSite::LookupFails => Ok(SitePublishing::LookupFailed {
                reason: "injected".to_string(),
            }),
            FakeSite::UpdateFails => Ok(SitePublishing::UpdateFailed {
                reason: "injected".to_string(),
            }),
            FakeSite::CreateFails => Err(status("ensure_site_publishing", 422)),
        }
    }

    async fn get_file_version(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_file_version {}", path));
        let key = format!("{}/{}", repo.full_name(), path);
        Ok(state.files.get(&key).map(|(_, version)| version.clone()))
    }

    async fn put_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        _message: &str,
        version: Option<&str>,
    ) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("put_file {}", path));
        if state.fail_put_path.as_deref() == Some(path) {
            return Err(status("put_file", 500));
        }
        let key = format!("{}/{}", repo.full_name(), path);
        let current = state.files.get(&key).map(|(_, v)| v.as_str());
        if current != version {
            return Err(status("put_file", 409));
        }
        state.commits += 1;
        let commit = format!("commit-{}", state.commits);
        let blob = format!("blob-{}", state.commits);
        state.files.insert(key, (content.to_vec(), blob));
        Ok(commit)
    }

    async fn get_latest_commit(&self, repo: &RepoRef) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_latest_commit {}", repo.full_name()));
        if state.fail_latest {
            return Err(status("get_latest_commit", 500));
        }
        if state.commits == 0 {
            return Err(RemoteError::Decode {
                operation: "get_latest_commit",
                message: "repository has no commits".to_string(),
            });
        }
        Ok(format!("head-{}", state.commits))
    }
}

/// Generator returning a fixed result and recording what it was asked.
#[derive(Debug, Default)]
pub(crate) struct StaticGenerator {
    pub files: Option<BTreeMap<String, String>>,
    pub seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl StaticGenerator {
    pub fn returning(files: &[(&str, &str)]) -> Self {
        Self {
            files: Some(
                files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            seen: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl AppGenerator for StaticGenerator {
    async fn generate(&self, brief: &str, attachment_names: &[String]) -> Option<BTreeMap<String, String>> {
        self.seen
            .lock()
            .unwrap()
            .push((brief.to_string(), attachment_names.to_vec()));
        self.files.clone()
    }
}

/// Poller with a fixed answer.
#[derive(Debug, Default)]
pub(crate) struct FixedPoller {
    pub reachable: bool,
    pub urls: Mutex<Vec<String>>,
}

impl FixedPoller {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable,
            urls: Mutex::default(),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reachability for FixedPoller {
    async fn wait_until_reachable(&self, url: &str, _deadline: Duration) -> bool {
        self.urls.lock().unwrap().push(url.to_string());
        self.reachable
    }
}

/// Notifier with a fixed outcome that records every payload.
#[derive(Debug)]
pub(crate) struct RecordingNotifier {
    pub outcome: Delivery,
    pub sent: Mutex<Vec<(String, PublishResult)>>,
}

impl RecordingNotifier {
    pub fn delivering() -> Self {
        Self::new(Delivery::Delivered { attempts: 1 })
    }

    pub fn exhausted() -> Self {
        Self::new(Delivery::Exhausted {
            attempts: 8,
            last_error: "status 500".to_string(),
        })
    }

    fn new(outcome: Delivery) -> Self {
        Self {
            outcome,
            sent: Mutex::default(),
        }
    }

    pub fn sent(&self) -> Vec<(String, PublishResult)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultNotifier for RecordingNotifier {
    async fn notify(&self, url: &str, payload: &PublishResult) -> Delivery {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        self.outcome.clone()
    }
}
