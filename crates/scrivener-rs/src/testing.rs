//! Scripted in-memory completion service.
//!
//! Replies are queued up front and handed out one per `create` call, in
//! order. Every request is recorded so tests can assert on exactly what was
//! sent. Also handy for offline demos of the chat loop.

use crate::api::client::{CompletionFuture, CompletionService};
use crate::api::streaming::StreamChunk;
use crate::{ChatRequest, Error, Result};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Reply {
    Chunks(Vec<StreamChunk>),
    /// Chunks followed by a mid-stream failure.
    Broken(Vec<StreamChunk>, String),
    Fail(Error),
}

#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply streamed as one chunk per whitespace-separated word.
    pub fn push_text(&self, text: &str) {
        let mut chunks = vec![StreamChunk::empty()];
        chunks.extend(text.split_inclusive(' ').map(StreamChunk::text));
        self.push_chunks(chunks);
    }

    pub fn push_chunks(&self, chunks: Vec<StreamChunk>) {
        self.push(Reply::Chunks(chunks));
    }

    /// Queue a reply whose stream fails after `text` has been delivered.
    pub fn push_broken_stream(&self, text: &str, reason: &str) {
        self.push(Reply::Broken(vec![StreamChunk::text(text)], reason.into()));
    }

    pub fn push_rate_limit(&self) {
        self.push_error(Error::Http {
            status: 429,
            body: "Rate limit reached".into(),
        });
    }

    pub fn push_error(&self, error: Error) {
        self.push(Reply::Fail(error));
    }

    /// Number of `create` calls so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

impl CompletionService for ScriptedService {
    fn create<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        Box::pin(async move {
            match reply {
                Some(Reply::Chunks(chunks)) => {
                    Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
                }
                Some(Reply::Broken(chunks, reason)) => {
                    let items: Vec<Result<StreamChunk>> = chunks
                        .into_iter()
                        .map(Ok)
                        .chain(std::iter::once(Err(Error::Stream(reason))))
                        .collect();
                    Ok(futures::stream::iter(items).boxed())
                }
                Some(Reply::Fail(error)) => Err(error),
                None => Err(Error::Transport("no scripted reply left".into())),
            }
        })
    }
}
