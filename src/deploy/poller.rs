//! Waits for a published site to answer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::PollConfig;
use crate::util::Backoff;

/// Confirms that a URL has become reachable.
#[async_trait]
pub trait Reachability: Send + Sync {
    /// `true` once a read of `url` succeeds, `false` once `deadline` has
    /// elapsed without one. Never an error.
    async fn wait_until_reachable(&self, url: &str, deadline: Duration) -> bool;
}

/// Polls with unauthenticated, uncached GETs and capped exponential backoff.
pub struct AvailabilityPoller {
    client: reqwest::Client,
    request_timeout: Duration,
    backoff: Backoff,
}

impl AvailabilityPoller {
    pub fn new(config: &PollConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            request_timeout: config.request_timeout,
            backoff: config.backoff,
        })
    }
}

#[async_trait]
impl Reachability for AvailabilityPoller {
    async fn wait_until_reachable(&self, url: &str, deadline: Duration) -> bool {
        let start = Instant::now();
        let mut attempt: u32 = 0;
        let mut last_status: Option<u16> = None;

        loop {
            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }

            let outcome = self
                .client
                .get(url)
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache")
                .timeout(self.request_timeout.min(remaining))
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(url, attempts = attempt + 1, elapsed_ms = start.elapsed().as_millis() as u64, "Site is reachable");
                    return true;
                }
                Ok(response) => last_status = Some(response.status().as_u16()),
                Err(e) => tracing::debug!(url, error = %e, "Availability check failed"),
            }

            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(self.backoff.delay(attempt).min(remaining)).await;
            attempt = attempt.saturating_add(1);
        }

        tracing::warn!(
            url,
            deadline_secs = deadline.as_secs(),
            last_status,
            "Site not reachable before deadline"
        );
        false
    }
}
