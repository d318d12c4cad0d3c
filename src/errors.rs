//! Typed error hierarchy for the publisher.
//!
//! Four enums cover the four failure surfaces:
//! - `ConfigError`: startup configuration is incomplete or malformed
//! - `InputError`: the task request cannot be turned into a bundle
//! - `RemoteError`: a single call to the repository provider failed
//! - `PipelineError`: terminal outcome of one publish run

use thiserror::Error;

use crate::deploy::pipeline::Step;

/// Errors raised while building [`crate::config::DeployerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {var} is not set")]
    Missing { var: &'static str },

    #[error("Invalid value '{value}' for {var}: {message}")]
    Invalid {
        var: &'static str,
        value: String,
        message: String,
    },
}

/// Errors in the caller-supplied request content.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Attachment name must not be empty")]
    EmptyAttachmentName,

    #[error("Attachment name '{name}' is not a relative file path (no empty, '.' or '..' segments, no backslashes)")]
    InvalidAttachmentPath { name: String },

    #[error("Attachment {name} is not a data URI (expected data:<mime>;base64,<payload> or data:<mime>,<payload>)")]
    InvalidDataUri { name: String },

    #[error("Attachment {name} has an invalid base64 payload: {source}")]
    InvalidBase64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Task '{task}' does not map to a usable repository name")]
    InvalidRepositoryName { task: String },
}

/// A failed call against the repository provider.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation}: malformed response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl RemoteError {
    /// The provider operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteError::Transport { operation, .. }
            | RemoteError::UnexpectedStatus { operation, .. }
            | RemoteError::Decode { operation, .. } => operation,
        }
    }
}

/// Terminal failure of a publish run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid secret")]
    Unauthorized,

    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("{step} failed: {source}")]
    RemoteFatal {
        step: Step,
        #[source]
        source: RemoteError,
    },

    #[error("Evaluation callback {url} not acknowledged after {attempts} attempts")]
    NotificationExhausted { url: String, attempts: u32 },
}
