//! Process-wide configuration for the publisher.
//!
//! Configuration is read once at startup from the environment (after an
//! optional `.env` file), validated eagerly and then shared read-only by
//! every pipeline run. Missing credentials are a startup failure, never a
//! per-request error.
//!
//! ```text
//! SECRET=...                 # shared secret expected in every task request
//! GITHUB_TOKEN=...           # bearer token for the repository provider
//! GITHUB_USERNAME=...        # owner of the published repositories
//! NOTIFY_ON_EXHAUSTED=ignore # fail | ignore
//! PAGES_WORKFLOW=v2          # v1 | v2
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::util::Backoff;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_LLM_MODEL: &str = "google/gemini-2.0-flash-lite-001";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 180;
const DEFAULT_POLL_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_POLL_INITIAL_DELAY_MS: u64 = 1_000;
const DEFAULT_POLL_MAX_DELAY_MS: u64 = 15_000;
const DEFAULT_NOTIFY_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_NOTIFY_INITIAL_DELAY_MS: u64 = 1_000;
const DEFAULT_NOTIFY_MAX_DELAY_MS: u64 = 60_000;
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// What happens when the evaluation callback is never acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyExhaustion {
    /// Surface the exhaustion to the original caller as a failure.
    Fail,
    /// Report `notified: false` in the response and carry on.
    #[default]
    Ignore,
}

impl fmt::Display for NotifyExhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyExhaustion::Fail => write!(f, "fail"),
            NotifyExhaustion::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for NotifyExhaustion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" | "strict" => Ok(NotifyExhaustion::Fail),
            "ignore" | "permissive" => Ok(NotifyExhaustion::Ignore),
            _ => Err("expected fail or ignore".to_string()),
        }
    }
}

/// Which GitHub Pages workflow definition is written to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagesWorkflow {
    /// Checkout, upload the repository root, deploy.
    V1,
    /// As `V1`, plus `configure-pages` with `enablement: true`.
    #[default]
    V2,
}

impl fmt::Display for PagesWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagesWorkflow::V1 => write!(f, "v1"),
            PagesWorkflow::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for PagesWorkflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1" | "1" => Ok(PagesWorkflow::V1),
            "v2" | "2" => Ok(PagesWorkflow::V2),
            _ => Err("expected v1 or v2".to_string()),
        }
    }
}

/// Where the reported `commit_sha` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitShaSource {
    /// The commit produced by the committer's last successful write.
    #[default]
    LastWrite,
    /// The head of the default branch, looked up after the poll.
    LatestCommit,
}

impl fmt::Display for CommitShaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitShaSource::LastWrite => write!(f, "last-write"),
            CommitShaSource::LatestCommit => write!(f, "latest-commit"),
        }
    }
}

impl FromStr for CommitShaSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "last-write" => Ok(CommitShaSource::LastWrite),
            "latest-commit" => Ok(CommitShaSource::LatestCommit),
            _ => Err("expected last-write or latest-commit".to_string()),
        }
    }
}

/// The policies that differed between historical variants of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePolicy {
    pub reconcile_permissions: bool,
    pub on_notify_exhausted: NotifyExhaustion,
    pub pages_workflow: PagesWorkflow,
    pub commit_sha_source: CommitShaSource,
    pub include_gitignore: bool,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            reconcile_permissions: true,
            on_notify_exhausted: NotifyExhaustion::default(),
            pages_workflow: PagesWorkflow::default(),
            commit_sha_source: CommitShaSource::default(),
            include_gitignore: false,
        }
    }
}

/// Optional chat-completion generation service.
#[derive(Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub auth: String,
    pub model: String,
    pub timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("auth", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Repository provider credentials and endpoints.
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub api_url: String,
    pub pages_base_url: Option<String>,
    pub timeout: Duration,
}

impl GitHubConfig {
    /// Base URL the published sites live under, without a trailing slash.
    pub fn pages_base(&self) -> String {
        match &self.pages_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.github.io", self.owner),
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("api_url", &self.api_url)
            .field("pages_base_url", &self.pages_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Availability poll settings.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub deadline: Duration,
    pub request_timeout: Duration,
    pub backoff: Backoff,
}

/// Evaluation callback settings.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub backoff: Backoff,
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected pretty or json".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

/// Immutable configuration shared by the server and every pipeline run.
#[derive(Clone)]
pub struct DeployerConfig {
    pub bind_addr: SocketAddr,
    pub secret: String,
    pub github: GitHubConfig,
    pub llm: Option<LlmConfig>,
    pub policy: PipelinePolicy,
    pub poll: PollConfig,
    pub notify: NotifyConfig,
    pub log: LogConfig,
}

impl fmt::Debug for DeployerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("secret", &"<redacted>")
            .field("github", &self.github)
            .field("llm", &self.llm)
            .field("policy", &self.policy)
            .field("poll", &self.poll)
            .field("notify", &self.notify)
            .field("log", &self.log)
            .finish()
    }
}

impl DeployerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let bind_addr_raw = env
            .optional("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: bind_addr_raw.clone(),
                message: e.to_string(),
            })?;

        let secret = env.required("SECRET")?;
        let github = GitHubConfig {
            token: env.required("GITHUB_TOKEN")?,
            owner: env.required("GITHUB_USERNAME")?,
            api_url: env
                .optional("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            pages_base_url: env.optional("PAGES_BASE_URL"),
            timeout: Duration::from_secs(
                env.parsed("GITHUB_TIMEOUT_SECS", DEFAULT_GITHUB_TIMEOUT_SECS)?,
            ),
        };

        // Generation is only enabled when both halves are present.
        let llm = match (env.optional("LLM_URL"), env.optional("LLM_AUTH")) {
            (Some(base_url), Some(auth)) => Some(LlmConfig {
                base_url,
                auth,
                model: env
                    .optional("LLM_MODEL")
                    .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                timeout: Duration::from_secs(
                    env.parsed("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?,
                ),
            }),
            _ => None,
        };

        let policy = PipelinePolicy {
            reconcile_permissions: env.flag("RECONCILE_PERMISSIONS", true)?,
            on_notify_exhausted: env.parsed("NOTIFY_ON_EXHAUSTED", NotifyExhaustion::default())?,
            pages_workflow: env.parsed("PAGES_WORKFLOW", PagesWorkflow::default())?,
            commit_sha_source: env.parsed("COMMIT_SHA_SOURCE", CommitShaSource::default())?,
            include_gitignore: env.flag("INCLUDE_GITIGNORE", false)?,
        };

        let poll = PollConfig {
            deadline: Duration::from_secs(
                env.parsed("POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
            ),
            request_timeout: Duration::from_secs(env.parsed(
                "POLL_REQUEST_TIMEOUT_SECS",
                DEFAULT_POLL_REQUEST_TIMEOUT_SECS,
            )?),
            backoff: Backoff::new(
                Duration::from_millis(
                    env.parsed("POLL_INITIAL_DELAY_MS", DEFAULT_POLL_INITIAL_DELAY_MS)?,
                ),
                Duration::from_millis(env.parsed("POLL_MAX_DELAY_MS", DEFAULT_POLL_MAX_DELAY_MS)?),
            ),
        };

        let max_attempts = env.parsed("NOTIFY_MAX_ATTEMPTS", DEFAULT_NOTIFY_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "NOTIFY_MAX_ATTEMPTS",
                value: "0".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }
        let notify = NotifyConfig {
            max_attempts,
            request_timeout: Duration::from_secs(
                env.parsed("NOTIFY_TIMEOUT_SECS", DEFAULT_NOTIFY_TIMEOUT_SECS)?,
            ),
            backoff: Backoff::new(
                Duration::from_millis(
                    env.parsed("NOTIFY_INITIAL_DELAY_MS", DEFAULT_NOTIFY_INITIAL_DELAY_MS)?,
                ),
                Duration::from_millis(
                    env.parsed("NOTIFY_MAX_DELAY_MS", DEFAULT_NOTIFY_MAX_DELAY_MS)?,
                ),
            ),
        };

        let log = LogConfig {
            filter: env
                .optional("LOG_FILTER")
                .or_else(|| env.optional("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            format: env.parsed("LOG_FORMAT", LogFormat::default())?,
        };

        Ok(Self {
            bind_addr,
            secret,
            github,
            llm,
            policy,
            poll,
            notify,
            log,
        })
    }

    /// Emit a one-line summary of the loaded configuration.
    pub fn trace_loaded(&self) {
        tracing::info!(
            bind_addr = %self.bind_addr,
            owner = %self.github.owner,
            api_url = %self.github.api_url,
            pages_base = %self.github.pages_base(),
            generation = self.llm.is_some(),
            reconcile_permissions = self.policy.reconcile_permissions,
            on_notify_exhausted = %self.policy.on_notify_exhausted,
            pages_workflow = %self.policy.pages_workflow,
            commit_sha_source = %self.policy.commit_sha_source,
            "Loaded configuration"
        );
    }
}

/// Thin wrapper that trims values and treats blank ones as unset.
struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing { var })
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                message: e.to_string(),
                value,
            }),
        }
    }

    fn flag(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(var) {
            None => Ok(default),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    var,
                    value,
                    message: "expected a boolean".to_string(),
                }),
            },
        }
    }
}
