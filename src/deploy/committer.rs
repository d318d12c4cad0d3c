//! Sequential, version-guarded writes of scaffolding and bundle files.
//!
//! There is no atomic multi-file commit. Each file is its own write, so a
//! failure partway through leaves the repository partially updated; the
//! error reports how far the run got. Re-running from the start is always
//! safe because every write targets a fixed path with fresh version token.

use thiserror::Error;

use super::bundle::FileBundle;
use super::github::{RepoRef, RepositoryHost};
use super::scaffold::ScaffoldFile;
use crate::errors::RemoteError;

/// What a complete commit run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Commit id of the last successful write.
    pub last_commit: Option<String>,
    /// Paths written, in order.
    pub written: Vec<String>,
}

/// A write failed; earlier writes are already on the remote.
#[derive(Debug, Error)]
#[error("Writing {path} failed after {} successful writes: {source}", .written.len())]
pub struct CommitError {
    pub path: String,
    pub written: Vec<String>,
    pub last_commit: Option<String>,
    #[source]
    pub source: RemoteError,
}

pub struct BundleCommitter<'a> {
    host: &'a dyn RepositoryHost,
    repo: &'a RepoRef,
    task: &'a str,
}

impl<'a> BundleCommitter<'a> {
    pub fn new(host: &'a dyn RepositoryHost, repo: &'a RepoRef, task: &'a str) -> Self {
        Self { host, repo, task }
    }

    /// Write `scaffold` in order, then every bundle file in bundle order.
    pub async fn commit(
        &self,
        scaffold: &[ScaffoldFile],
        bundle: &FileBundle,
    ) -> Result<CommitOutcome, CommitError> {
        let mut outcome = CommitOutcome {
            last_commit: None,
            written: Vec::with_capacity(scaffold.len() + bundle.len()),
        };

        for file in scaffold {
            self.write(file.path, file.content.as_bytes(), &file.message, &mut outcome)
                .await?;
        }
        for file in bundle.iter() {
            let message = format!("[{}] Update {}", self.task, file.path);
            self.write(file.path, file.content, &message, &mut outcome)
                .await?;
        }

        tracing::info!(
            repo = %self.repo.full_name(),
            files = outcome.written.len(),
            commit = outcome.last_commit.as_deref().unwrap_or(""),
            "Committed files"
        );
        Ok(outcome)
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        outcome: &mut CommitOutcome,
    ) -> Result<(), CommitError> {
        let fail = |source: RemoteError, outcome: &CommitOutcome| CommitError {
            path: path.to_string(),
            written: outcome.written.clone(),
            last_commit: outcome.last_commit.clone(),
            source,
        };

        // Never reuse a token across writes; the file may have moved since.
        let version = self
            .host
            .get_file_version(self.repo, path)
            .await
            .map_err(|e| fail(e, outcome))?;
        let commit = self
            .host
            .put_file(self.repo, path, content, message, version.as_deref())
            .await
            .map_err(|e| fail(e, outcome))?;

        tracing::debug!(path, commit = %commit, updated = version.is_some(), "Wrote file");
        outcome.last_commit = Some(commit);
        outcome.written.push(path.to_string());
        Ok(())
    }
}
