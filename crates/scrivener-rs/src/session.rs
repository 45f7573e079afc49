//! The caller-owned completion session.
//!
//! A [`CompletionSession`] bundles everything one logical flow of control
//! needs to talk to the model: the retrying client, an optional completion
//! cache, the model name and the sampling temperature. Binaries build one at
//! startup and pass it to every turn; nothing here is global.

use crate::api::client::CompletionService;
use crate::api::retry::{RetryConfig, RetryingClient};
use crate::api::streaming::{StreamChunk, merge, merge_chunks};
use crate::cache::{CachedCompletion, CompletionCache, RequestKey};
use crate::{ChatRequest, Error, Message, Result};
use std::time::Instant;
use tracing::debug;

/// One prompt/answer round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Full answer text.
    pub text: String,
    /// The prior messages, the user prompt, and the assistant answer.
    pub messages: Vec<Message>,
    /// Coalesced response chunks.
    pub chunks: Vec<StreamChunk>,
    /// Whether the answer was replayed from the cache.
    pub cached: bool,
}

impl Exchange {
    /// The trailing user/assistant pair.
    pub fn last_pair(&self) -> &[Message] {
        let start = self.messages.len().saturating_sub(2);
        &self.messages[start..]
    }
}

pub struct CompletionSession<S> {
    client: RetryingClient<S>,
    cache: Option<CompletionCache>,
    model: String,
    temperature: f32,
}

impl<S: CompletionService> CompletionSession<S> {
    /// Session with the default retry policy, no cache and temperature 1.0.
    pub fn new(service: S, model: impl Into<String>) -> Self {
        Self {
            client: RetryingClient::new(service, RetryConfig::default()),
            cache: None,
            model: model.into(),
            temperature: 1.0,
        }
    }

    /// Serve repeated prompts from `cache`.
    pub fn with_cache(mut self, cache: CompletionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(self, config: RetryConfig) -> Self {
        let Self {
            client,
            cache,
            model,
            temperature,
        } = self;
        Self {
            client: RetryingClient::new(client.into_service(), config),
            cache,
            model,
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn cache(&self) -> Option<&CompletionCache> {
        self.cache.as_ref()
    }

    pub fn service(&self) -> &S {
        self.client.service()
    }

    /// Send `prior + [user(prompt)]` and stream the answer to `on_fragment`.
    ///
    /// With a cache attached, the request is keyed on `(prompt, prior)`. A hit
    /// replays the stored chunks through the same merge, so the sink sees the
    /// same fragments a live call would have produced.
    pub async fn complete(
        &mut self,
        prompt: &str,
        prior: &[Message],
        mut on_fragment: impl FnMut(&str),
    ) -> Result<Exchange> {
        let mut messages = prior.to_vec();
        messages.push(Message::user(prompt));
        let request =
            ChatRequest::new(&self.model, messages.clone()).with_temperature(self.temperature);
        debug!(
            "Completing prompt ({} chars) with {} prior message(s)",
            prompt.len(),
            prior.len()
        );
        let started = Instant::now();

        let (completion, cached) = match self.cache.as_mut() {
            Some(cache) => {
                let key = RequestKey::new(prompt, prior);
                let client = &self.client;
                let request = &request;
                let sink = &mut on_fragment;
                let mut computed = false;
                let flag = &mut computed;
                let completion = cache
                    .get_or_compute(&key, move || async move {
                        *flag = true;
                        let stream = client.submit(request).await?;
                        let merged = merge(stream, sink).await?;
                        Ok::<_, Error>(CachedCompletion {
                            chunks: merged.chunks,
                            text: merged.text,
                        })
                    })
                    .await?;
                if computed {
                    (completion, false)
                } else {
                    let replayed = merge_chunks(completion.chunks, &mut on_fragment);
                    (
                        CachedCompletion {
                            chunks: replayed.chunks,
                            text: replayed.text,
                        },
                        true,
                    )
                }
            }
            None => {
                let stream = self.client.submit(&request).await?;
                let merged = merge(stream, &mut on_fragment).await?;
                (
                    CachedCompletion {
                        chunks: merged.chunks,
                        text: merged.text,
                    },
                    false,
                )
            }
        };

        debug!(
            "Completion finished in {:.1}s ({} chars, cached: {cached})",
            started.elapsed().as_secs_f64(),
            completion.text.len()
        );
        messages.push(Message::assistant(&completion.text));
        Ok(Exchange {
            text: completion.text,
            messages,
            chunks: completion.chunks,
            cached,
        })
    }
}
