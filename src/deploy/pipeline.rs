//! End-to-end publish run.
//!
//! ```text
//! AuthCheck → BuildBundle → EnsureRepository
//!   → ReconcilePermissions → ReconcileSitePublishing
//!   → CommitBundle → PollAvailability → FetchLatestCommit → Notify
//! ```
//!
//! The flow is linear. Each step carries a [`FailureMode`]: fatal steps end
//! the run with a [`PipelineError`], best-effort steps are logged and listed
//! in the response's `degraded` field, ignored steps only affect the
//! response shape. All remote calls are awaited one at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::Instrument;
use uuid::Uuid;

use super::bundle::{FileBundle, decode_attachments, is_safe_relative_path};
use super::committer::BundleCommitter;
use super::generator::{AppGenerator, LlmGenerator, TemplateOnly};
use super::github::{GitHubClient, RepoRef, RepositoryHost};
use super::models::{PublishResult, PublishStatus, TaskRequest, TaskResponse};
use super::notifier::{CallbackNotifier, Delivery, ResultNotifier};
use super::poller::{AvailabilityPoller, Reachability};
use super::scaffold::{ScaffoldContext, scaffold_files};
use super::templates::template_from_brief;
use crate::config::{CommitShaSource, DeployerConfig, NotifyExhaustion, PipelinePolicy};
use crate::errors::{InputError, PipelineError, RemoteError};
use crate::util::{constant_time_eq, repo_slug};

/// The steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    AuthCheck,
    BuildBundle,
    EnsureRepository,
    ReconcilePermissions,
    ReconcileSitePublishing,
    CommitBundle,
    PollAvailability,
    FetchLatestCommit,
    Notify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a step's failure affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The run stops and the caller gets an error.
    Fatal,
    /// Logged and reported as degraded; the run continues.
    BestEffort,
    /// Only changes the response (`status`, `notified`).
    Ignored,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::AuthCheck,
        Step::BuildBundle,
        Step::EnsureRepository,
        Step::ReconcilePermissions,
        Step::ReconcileSitePublishing,
        Step::CommitBundle,
        Step::PollAvailability,
        Step::FetchLatestCommit,
        Step::Notify,
    ];

    /// Failure mode of the step under `policy`. Site publishing is listed as
    /// fatal because a failed create stops the run; its other shortfalls
    /// come back as degraded outcomes rather than errors.
    pub fn failure_mode(self, policy: &PipelinePolicy) -> FailureMode {
        match self {
            Step::AuthCheck
            | Step::BuildBundle
            | Step::EnsureRepository
            | Step::ReconcileSitePublishing
            | Step::CommitBundle => FailureMode::Fatal,
            Step::ReconcilePermissions | Step::FetchLatestCommit => FailureMode::BestEffort,
            Step::PollAvailability => FailureMode::Ignored,
            Step::Notify => match policy.on_notify_exhausted {
                NotifyExhaustion::Fail => FailureMode::Fatal,
                NotifyExhaustion::Ignore => FailureMode::Ignored,
            },
        }
    }

    /// Whether the step runs at all under `policy`.
    pub fn is_enabled(self, policy: &PipelinePolicy) -> bool {
        match self {
            Step::ReconcilePermissions => policy.reconcile_permissions,
            Step::FetchLatestCommit => policy.commit_sha_source == CommitShaSource::LatestCommit,
            _ => true,
        }
    }
}

/// Per-process inputs of every run.
#[derive(Clone)]
pub struct PipelineSettings {
    pub secret: String,
    pub owner: String,
    /// Base URL of published sites, without trailing slash.
    pub pages_base: String,
    pub policy: PipelinePolicy,
    pub poll_deadline: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &DeployerConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            owner: config.github.owner.clone(),
            pages_base: config.github.pages_base(),
            policy: config.policy.clone(),
            poll_deadline: config.poll.deadline,
        }
    }
}

impl fmt::Debug for PipelineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSettings")
            .field("secret", &"<redacted>")
            .field("owner", &self.owner)
            .field("pages_base", &self.pages_base)
            .field("policy", &self.policy)
            .field("poll_deadline", &self.poll_deadline)
            .finish()
    }
}

/// Output of the BuildBundle step.
struct PreparedBundle {
    repo: RepoRef,
    pages_url: String,
    bundle: FileBundle,
}

/// Composes the provider, generator, poller and notifier into one run.
pub struct PublishPipeline {
    host: Arc<dyn RepositoryHost>,
    generator: Arc<dyn AppGenerator>,
    poller: Arc<dyn Reachability>,
    notifier: Arc<dyn ResultNotifier>,
    settings: PipelineSettings,
}

impl PublishPipeline {
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        generator: Arc<dyn AppGenerator>,
        poller: Arc<dyn Reachability>,
        notifier: Arc<dyn ResultNotifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            host,
            generator,
            poller,
            notifier,
            settings,
        }
    }

    /// Wire the real HTTP collaborators from configuration.
    pub fn from_config(config: &DeployerConfig) -> Result<Self, reqwest::Error> {
        let generator: Arc<dyn AppGenerator> = match &config.llm {
            Some(llm) => Arc::new(LlmGenerator::new(llm)?),
            None => Arc::new(TemplateOnly),
        };
        Ok(Self::new(
            Arc::new(GitHubClient::new(&config.github)?),
            generator,
            Arc::new(AvailabilityPoller::new(&config.poll)?),
            Arc::new(CallbackNotifier::new(&config.notify)?),
            PipelineSettings::from_config(config),
        ))
    }

    /// Run one request to completion or to its first fatal failure.
    pub async fn run(&self, request: &TaskRequest) -> Result<TaskResponse, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "publish",
            %run_id,
            task = %request.task,
            round = request.round
        );
        let result = self.execute(request).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| tracing::error!(error = %e, "Publish run failed"));
        }
        result
    }

    async fn execute(&self, request: &TaskRequest) -> Result<TaskResponse, PipelineError> {
        let policy = &self.settings.policy;

        if !constant_time_eq(&request.secret, &self.settings.secret) {
            tracing::warn!(step = %Step::AuthCheck, "Rejected request with invalid secret");
            return Err(PipelineError::Unauthorized);
        }

        let PreparedBundle {
            repo,
            pages_url,
            bundle,
        } = self.build_bundle(request).await?;
        tracing::info!(repo = %repo.full_name(), files = bundle.len(), "Bundle ready");

        let mut degraded: Vec<Step> = Vec::new();

        let ensured = self
            .host
            .ensure_repository(&repo)
            .await
            .map_err(|source| fatal(Step::EnsureRepository, source))?;
        tracing::info!(repo = %repo.full_name(), created = ensured.created, "Repository ready");

        if Step::ReconcilePermissions.is_enabled(policy) {
            if let Err(e) = self.host.set_workflow_write_permissions(&repo).await {
                best_effort_failed(Step::ReconcilePermissions, &e.to_string(), &mut degraded);
            }
        }

        let site = self
            .host
            .ensure_site_publishing(&repo)
            .await
            .map_err(|source| fatal(Step::ReconcileSitePublishing, source))?;
        if site.is_degraded() {
            best_effort_failed(Step::ReconcileSitePublishing, &format!("{:?}", site), &mut degraded);
        } else {
            tracing::info!(outcome = ?site, "Site publishing reconciled");
        }

        let ctx = ScaffoldContext {
            owner: &repo.owner,
            repo: &repo.name,
            task: &request.task,
            round: request.round,
            brief: &request.brief,
            pages_url: &pages_url,
            year: Utc::now().year(),
        };
        let scaffold = scaffold_files(&ctx, policy.pages_workflow, policy.include_gitignore);
        let committed = BundleCommitter::new(self.host.as_ref(), &repo, &request.task)
            .commit(&scaffold, &bundle)
            .await
            .map_err(|e| {
                tracing::error!(
                    path = %e.path,
                    written = e.written.len(),
                    last_commit = e.last_commit.as_deref().unwrap_or(""),
                    "Repository left partially updated"
                );
                fatal(Step::CommitBundle, e.source)
            })?;

        let reachable = self
            .poller
            .wait_until_reachable(&pages_url, self.settings.poll_deadline)
            .await;

        let mut commit_sha = committed.last_commit;
        if Step::FetchLatestCommit.is_enabled(policy) || commit_sha.is_none() {
            match self.host.get_latest_commit(&repo).await {
                Ok(sha) => commit_sha = Some(sha),
                Err(e) => best_effort_failed(Step::FetchLatestCommit, &e.to_string(), &mut degraded),
            }
        }

        let result = PublishResult {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: repo.html_url(),
            commit_sha: commit_sha.unwrap_or_default(),
            pages_url,
        };

        let delivery = self.notifier.notify(&request.evaluation_url, &result).await;
        if let Delivery::Exhausted { attempts, last_error } = &delivery {
            match Step::Notify.failure_mode(policy) {
                FailureMode::Fatal => {
                    return Err(PipelineError::NotificationExhausted {
                        url: request.evaluation_url.clone(),
                        attempts: *attempts,
                    });
                }
                _ => tracing::warn!(
                    url = %request.evaluation_url,
                    attempts,
                    error = %last_error,
                    "Evaluation callback not acknowledged"
                ),
            }
        }

        let status = if reachable {
            PublishStatus::Published
        } else {
            PublishStatus::Pending
        };
        tracing::info!(
            status = ?status,
            commit = %result.commit_sha,
            notified = delivery.is_delivered(),
            degraded = degraded.len(),
            "Publish run finished"
        );

        Ok(TaskResponse {
            status,
            result,
            notified: delivery.is_delivered(),
            degraded: degraded.iter().map(Step::to_string).collect(),
        })
    }

    /// Validate the request and assemble its files. Nothing remote is
    /// touched until every input check has passed.
    async fn build_bundle(&self, request: &TaskRequest) -> Result<PreparedBundle, InputError> {
        let slug = repo_slug(&request.task).ok_or_else(|| InputError::InvalidRepositoryName {
            task: request.task.clone(),
        })?;
        let attachments = decode_attachments(&request.attachments)?;
        let names: Vec<String> = attachments.iter().map(|a| a.name.clone()).collect();

        let generated: BTreeMap<String, Vec<u8>> =
            match self.generator.generate(&request.brief, &names).await {
                Some(files) => {
                    tracing::info!(files = files.len(), "Using generated app");
                    files
                        .into_iter()
                        .filter_map(|(path, content)| {
                            let path = path.trim().trim_start_matches('/').to_string();
                            if !is_safe_relative_path(&path) {
                                tracing::warn!(path = %path, "Dropping generated file with unsafe path");
                                return None;
                            }
                            Some((path, content.into_bytes()))
                        })
                        .collect()
                }
                None => {
                    tracing::info!("Using fallback template");
                    template_from_brief(&request.brief, &attachments)
                }
            };

        Ok(PreparedBundle {
            pages_url: format!("{}/{}/", self.settings.pages_base, slug),
            repo: RepoRef::new(self.settings.owner.clone(), slug),
            bundle: FileBundle::merge(generated, attachments),
        })
    }
}

fn fatal(step: Step, source: RemoteError) -> PipelineError {
    PipelineError::RemoteFatal { step, source }
}

fn best_effort_failed(step: Step, reason: &str, degraded: &mut Vec<Step>) {
    tracing::warn!(step = %step, reason, "Best-effort step failed, continuing");
    degraded.push(step);
}
