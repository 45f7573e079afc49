//! The remote completion service seam and its HTTP implementation.

use crate::api::streaming::{ChunkStream, SseDecoder, StreamChunk};
use crate::{API_KEY_ENV, ChatRequest, Error, OPENAI_API_BASE, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Boxed future returned by [`CompletionService::create`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<ChunkStream>> + Send + 'a>>;

/// Anything that can turn a [`ChatRequest`] into a chunk stream.
///
/// A rate limit must surface as `Error::Http { status: 429, .. }` from the
/// returned future so [`RetryingClient`](super::retry::RetryingClient) can
/// recognize it.
pub trait CompletionService: Send + Sync {
    fn create<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a>;
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    fn create<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        (**self).create(request)
    }
}

/// Non-streamed response body. Only the first choice's text is kept.
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

/// Async HTTP client for an OpenAI-compatible chat completions endpoint.
pub struct HttpCompletionClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) api_base: String,
}

impl HttpCompletionClient {
    /// Create a client against the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_api_base(api_key, OPENAI_API_BASE)
    }

    /// Create a client against a custom base URL (proxies, compatible hosts).
    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("scrivener-rs/0.1")
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| Error::MissingApiKey(API_KEY_ENV.into()))?;
        Self::new(key)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChunkStream> {
        debug!(
            "LLM request: model={}, messages={}, stream={}, temp={}",
            request.model,
            request.messages.len(),
            request.stream,
            request.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(request).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        debug!(
            "LLM response: HTTP {} after {:.1}s",
            status,
            start.elapsed().as_secs_f64()
        );
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        if request.stream {
            Ok(sse_stream(resp))
        } else {
            let text = resp.text().await?;
            let parsed: RawChatResponse = serde_json::from_str(&text)?;
            let content = parsed
                .choices
                .and_then(|c| c.into_iter().next())
                .and_then(|c| c.message.content);
            let chunk = match content {
                Some(content) => StreamChunk::text(content),
                None => StreamChunk::empty(),
            };
            Ok(futures::stream::iter([Ok(chunk)]).boxed())
        }
    }
}

impl CompletionService for HttpCompletionClient {
    fn create<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        Box::pin(self.send(request))
    }
}

/// Turn a streaming response body into a chunk stream.
///
/// Reads with `chunk()` so long responses never hit a single-body timeout.
fn sse_stream(resp: reqwest::Response) -> ChunkStream {
    struct State {
        resp: reqwest::Response,
        decoder: SseDecoder,
        pending: VecDeque<StreamChunk>,
        finished: bool,
    }

    let state = State {
        resp,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                return Some((Ok(chunk), st));
            }
            if st.finished || st.decoder.is_done() {
                return None;
            }
            match st.resp.chunk().await {
                Ok(Some(bytes)) => st.pending.extend(st.decoder.feed(&bytes)),
                Ok(None) => {
                    st.finished = true;
                    st.pending.extend(st.decoder.finish());
                }
                Err(e) => {
                    st.finished = true;
                    return Some((
                        Err(Error::Stream(format!("failed to read streaming chunk: {e}"))),
                        st,
                    ));
                }
            }
        }
    })
    .boxed()
}
