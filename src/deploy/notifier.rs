//! Delivery of the publish result to the evaluation callback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::models::PublishResult;
use crate::config::NotifyConfig;
use crate::util::Backoff;

/// Result of delivering a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Delivery::Delivered { attempts } | Delivery::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Sends a [`PublishResult`] to a callback URL.
#[async_trait]
pub trait ResultNotifier: Send + Sync {
    async fn notify(&self, url: &str, payload: &PublishResult) -> Delivery;
}

/// JSON POST with capped exponential retries. Only a `200` counts as
/// delivered.
pub struct CallbackNotifier {
    client: reqwest::Client,
    max_attempts: u32,
    request_timeout: Duration,
    backoff: Backoff,
}

impl CallbackNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            max_attempts: config.max_attempts.max(1),
            request_timeout: config.request_timeout,
            backoff: config.backoff,
        })
    }

    /// Delays slept between attempts; one fewer than the attempt count.
    pub fn retry_schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|n| self.backoff.delay(n))
            .collect()
    }
}

#[async_trait]
impl ResultNotifier for CallbackNotifier {
    async fn notify(&self, url: &str, payload: &PublishResult) -> Delivery {
        let schedule = self.retry_schedule();
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            let sent = self
                .client
                .post(url)
                .json(payload)
                .timeout(self.request_timeout)
                .send()
                .await;
            match sent {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::info!(url, attempts = attempt + 1, "Evaluation callback acknowledged");
                    return Delivery::Delivered {
                        attempts: attempt + 1,
                    };
                }
                Ok(response) => last_error = format!("status {}", response.status().as_u16()),
                Err(e) => last_error = e.to_string(),
            }

            if let Some(&delay) = schedule.get(attempt as usize) {
                tracing::debug!(url, attempt = attempt + 1, error = %last_error, delay_ms = delay.as_millis() as u64, "Callback failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        Delivery::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
