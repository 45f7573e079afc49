//! Bounded retry for rate-limited completion requests.
//!
//! Only the rate-limit signal (HTTP 429) is retried. Every other failure is
//! returned to the caller on the first attempt. The delay between attempts is
//! chosen by a [`BackoffPolicy`]; the default is the literal linear countdown
//! `LINEAR_BACKOFF_BASE - remaining_budget` units, which waits 0, 1, 2, 3, 4
//! units for a budget of five.

use crate::api::client::CompletionService;
use crate::api::streaming::ChunkStream;
use crate::{ChatRequest, Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Retries granted to a request when the caller does not say otherwise.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Minuend of the linear countdown delay.
pub const LINEAR_BACKOFF_BASE: u32 = 5;

/// How long to wait before resubmitting a rate-limited request.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    /// `(LINEAR_BACKOFF_BASE - remaining) * unit`. Grows by one unit per retry.
    LinearCountdown,
    /// `unit * multiplier^attempt`, capped at `max_delay`.
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt (0 = fail on the first 429).
    pub retry_budget: u32,
    /// One backoff "time unit".
    pub unit: Duration,
    pub policy: BackoffPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            unit: Duration::from_secs(1),
            policy: BackoffPolicy::LinearCountdown,
        }
    }
}

impl RetryConfig {
    /// Create a config with the given retry budget and default timing.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retry_budget: retries,
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delay before the retry made while `remaining` retries are still left.
    pub fn delay_for_budget(&self, remaining: u32) -> Duration {
        match &self.policy {
            BackoffPolicy::LinearCountdown => {
                self.unit * LINEAR_BACKOFF_BASE.saturating_sub(remaining)
            }
            BackoffPolicy::Exponential {
                multiplier,
                max_delay,
            } => {
                let attempt = self.retry_budget.saturating_sub(remaining);
                let base = self.unit.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(base.min(max_delay.as_secs_f64()))
            }
        }
    }
}

/// Wraps a [`CompletionService`] with the retry policy.
pub struct RetryingClient<S> {
    service: S,
    config: RetryConfig,
}

impl<S: CompletionService> RetryingClient<S> {
    pub fn new(service: S, config: RetryConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    /// Submit with the configured retry budget.
    pub async fn submit(&self, request: &ChatRequest) -> Result<ChunkStream> {
        self.submit_with_budget(request, self.config.retry_budget)
            .await
    }

    /// Submit the whole request, resubmitting it after each rate limit until
    /// `retry_budget` is spent.
    pub async fn submit_with_budget(
        &self,
        request: &ChatRequest,
        mut retry_budget: u32,
    ) -> Result<ChunkStream> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            info!("Sending completion request...");
            match self.service.create(request).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_rate_limit() => {
                    if retry_budget == 0 {
                        return Err(Error::RateLimited { attempts });
                    }
                    let delay = self.config.delay_for_budget(retry_budget);
                    warn!(
                        "Rate limit error, retrying in {:.1}s ({retry_budget} retries left)",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    retry_budget -= 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
