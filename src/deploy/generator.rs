//! Optional app generation through a chat-completion service.
//!
//! Any failure (no service configured, transport error, non-success status,
//! malformed or incomplete JSON) yields `None` and the caller falls back to
//! the templates.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::util::extract_json_object;

const SYSTEM_PROMPT: &str = "Return STRICT JSON with a top-level 'files' object.";

/// The file every generated app must contain.
pub const REQUIRED_ENTRY: &str = "index.html";

/// Produces app files for a brief, or nothing.
#[async_trait]
pub trait AppGenerator: Send + Sync {
    async fn generate(
        &self,
        brief: &str,
        attachment_names: &[String],
    ) -> Option<BTreeMap<String, String>>;
}

/// Generator used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateOnly;

#[async_trait]
impl AppGenerator for TemplateOnly {
    async fn generate(&self, _brief: &str, _attachment_names: &[String]) -> Option<BTreeMap<String, String>> {
        None
    }
}

/// Chat-completion backed generator.
pub struct LlmGenerator {
    client: reqwest::Client,
    endpoint: String,
    auth: String,
    model: String,
}

impl LlmGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            auth: config.auth.clone(),
            model: config.model.clone(),
        })
    }

    fn request_body(&self, brief: &str, attachment_names: &[String]) -> Value {
        let user = format!(
            "Build a minimal static app for GitHub Pages. Include index.html and README.md.\n\
             Brief: {}\nAttachments: {:?}\nReturn JSON ONLY.",
            brief, attachment_names
        );
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user},
            ],
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
        })
    }
}

#[async_trait]
impl AppGenerator for LlmGenerator {
    async fn generate(
        &self,
        brief: &str,
        attachment_names: &[String],
    ) -> Option<BTreeMap<String, String>> {
        let response = match self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.auth)
            .json(&self.request_body(brief, attachment_names))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Generation request failed, using template");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Generation service returned error status, using template");
            return None;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Generation response is not JSON, using template");
                return None;
            }
        };

        let files = parse_completion(&body);
        if files.is_none() {
            tracing::warn!("Generation response has no usable files object, using template");
        }
        files
    }
}

/// Pull the `files` map out of a chat-completion response body.
pub fn parse_completion(body: &Value) -> Option<BTreeMap<String, String>> {
    let content = body
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?;
    parse_files(content)
}

/// Parse the first JSON object in `content` and return its `files` map.
/// Non-string values are kept as their JSON text.
pub fn parse_files(content: &str) -> Option<BTreeMap<String, String>> {
    let object = extract_json_object(content)?;
    let parsed: Value = serde_json::from_str(&object).ok()?;
    let files = parsed.get("files")?.as_object()?;
    if !files.contains_key(REQUIRED_ENTRY) {
        return None;
    }
    Some(
        files
            .iter()
            .map(|(path, value)| {
                let content = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (path.clone(), content)
            })
            .collect(),
    )
}
