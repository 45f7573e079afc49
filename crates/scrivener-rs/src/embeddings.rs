//! Bounded, cooperative embedding fan-out.
//!
//! [`EmbeddingGenerator::generate_many`] builds one future per word and polls
//! them together on the calling task with `join_all`. A semaphore caps how
//! many requests are in flight. A failed word is logged, waits out the
//! generator's shared backoff (which grows with every failure across all
//! words), and is left out of the result. Nothing is retried.

use crate::{API_KEY_ENV, Error, OPENAI_API_BASE, Result};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Requests allowed in flight at once.
    pub concurrency: usize,
    /// Backoff before the first failure bumps it.
    pub initial_backoff: Duration,
    /// Added to the shared backoff on every failure.
    pub backoff_step: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.into(),
            concurrency: 10,
            initial_backoff: Duration::from_millis(500),
            backoff_step: Duration::from_millis(100),
        }
    }
}

impl EmbeddingConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, step: Duration) -> Self {
        self.initial_backoff = initial;
        self.backoff_step = step;
        self
    }
}

pub type EmbeddingFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>>;

/// Anything that can embed one piece of text.
pub trait EmbeddingService: Send + Sync {
    fn embed<'a>(&'a self, model: &'a str, text: &'a str) -> EmbeddingFuture<'a>;
}

impl<T: EmbeddingService + ?Sized> EmbeddingService for &T {
    fn embed<'a>(&'a self, model: &'a str, text: &'a str) -> EmbeddingFuture<'a> {
        (**self).embed(model, text)
    }
}

#[derive(Deserialize, Debug)]
struct RawEmbeddingResponse {
    data: Vec<RawEmbedding>,
}

#[derive(Deserialize, Debug)]
struct RawEmbedding {
    embedding: Vec<f32>,
}

/// HTTP client for the `/embeddings` endpoint.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl HttpEmbeddingClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_api_base(api_key, OPENAI_API_BASE)
    }

    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("scrivener-rs/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| Error::MissingApiKey(API_KEY_ENV.into()))?;
        Self::new(key)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base)
    }

    async fn send(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        debug!("Creating embedding for: '{text}'...");
        let start = Instant::now();
        let resp = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&json!({"input": text, "model": model}))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: RawEmbeddingResponse = serde_json::from_str(&resp.text().await?)?;
        debug!(
            "Done embedding for: '{text}' ({:.1}s)",
            start.elapsed().as_secs_f64()
        );
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Json("embedding response has no data".into()))
    }
}

impl EmbeddingService for HttpEmbeddingClient {
    fn embed<'a>(&'a self, model: &'a str, text: &'a str) -> EmbeddingFuture<'a> {
        Box::pin(self.send(model, text))
    }
}

/// Embeds many words concurrently under one shared backoff.
pub struct EmbeddingGenerator<E> {
    service: E,
    config: EmbeddingConfig,
    /// Shared across every task; only grows.
    backoff_ms: AtomicU64,
    failures: AtomicUsize,
}

impl<E: EmbeddingService> EmbeddingGenerator<E> {
    pub fn new(service: E, config: EmbeddingConfig) -> Self {
        let backoff_ms = config.initial_backoff.as_millis() as u64;
        Self {
            service,
            config,
            backoff_ms: AtomicU64::new(backoff_ms),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Current value of the shared backoff.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms.load(Ordering::Relaxed))
    }

    /// Failures recorded over the generator's lifetime.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Embed a single text.
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.service.embed(&self.config.model, text).await
    }

    /// Embed every word. Words that fail are missing from the map.
    pub async fn generate_many(&self, words: &[String]) -> BTreeMap<String, Vec<f32>> {
        let semaphore = Semaphore::new(self.config.concurrency.max(1));
        let tasks = words.iter().map(|word| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                match self.generate(word).await {
                    Ok(embedding) => Some((word.clone(), embedding)),
                    Err(e) => {
                        warn!("Failed to generate embedding for {word}: {e}");
                        tokio::time::sleep(self.record_failure()).await;
                        None
                    }
                }
            }
        });
        let results: BTreeMap<String, Vec<f32>> =
            join_all(tasks).await.into_iter().flatten().collect();
        debug!("Embedded {}/{} word(s)", results.len(), words.len());
        results
    }

    /// Grow the shared backoff and return the new value.
    fn record_failure(&self) -> Duration {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let step = self.config.backoff_step.as_millis() as u64;
        let previous = self.backoff_ms.fetch_add(step, Ordering::Relaxed);
        Duration::from_millis(previous + step)
    }
}
