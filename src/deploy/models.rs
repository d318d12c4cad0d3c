use serde::{Deserialize, Serialize};

/// One publish job as posted to `/api-task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    #[serde(alias = "taskId")]
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub brief: String,
    /// Evaluation hints; passed through untouched.
    #[serde(default)]
    pub checks: Vec<serde_json::Value>,
    #[serde(alias = "evaluationUrl")]
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A file supplied inline with the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// `data:<mime>;base64,<payload>` or `data:<mime>,<percent-encoded payload>`.
    #[serde(alias = "dataUri")]
    pub url: String,
}

/// Result of a publish run. This exact document is posted to the
/// evaluation callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub email: String,
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Whether the published site was confirmed reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Published,
    Pending,
}

/// Response body returned to the caller of `/api-task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: PublishStatus,
    #[serde(flatten)]
    pub result: PublishResult,
    pub notified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}
