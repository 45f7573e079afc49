//! Completion session engine for chat-style LLM front ends.
//!
//! `scrivener-rs` drives an OpenAI-compatible chat completions endpoint and
//! provides the stateful pieces that sit between a terminal prompt and the
//! remote model:
//!
//! - **Streaming merge** ([`api::streaming`]): coalesces partial response
//!   chunks into one text while echoing fragments to a display sink.
//! - **Retrying client** ([`api::retry`]): resubmits rate-limited requests
//!   under a bounded, configurable backoff policy.
//! - **Completion cache** ([`cache`]): content-addresses requests with a
//!   SHA-256 digest of their canonical JSON so identical prompts replay
//!   from disk instead of hitting the network.
//! - **Context window manager** ([`context`]): counts tokens, compacts the
//!   active window once per turn when it runs over budget, and persists the
//!   full history after every turn.
//! - **Artifact parser** ([`scripts`]): splits a markdown completion into
//!   named code artifacts, resolves name collisions, classifies notebooks,
//!   and discovers function names.
//!
//! # Getting started
//!
//! ```ignore
//! use scrivener_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> scrivener_rs::Result<()> {
//!     let client = HttpCompletionClient::from_env()?;
//!     let mut session = CompletionSession::new(client, DEFAULT_MODEL);
//!
//!     let exchange = session
//!         .complete("Write a haiku about borrow checking.", &[], |f| print!("{f}"))
//!         .await?;
//!     println!("\n{} messages in context", exchange.messages.len());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | HTTP client, SSE streaming merge, retry policy, per-model pricing |
//! | [`cache`] | Canonical request keys, digests, persistent completion cache |
//! | [`context`] | Token accounting, compaction, conversation persistence |
//! | [`scripts`] | Artifact extraction, classification, rendering, prompt trimming |
//! | [`session`] | The caller-owned [`CompletionSession`](session::CompletionSession) |
//! | [`input`] | Multi-line terminal input protocol |
//! | [`embeddings`] | Bounded cooperative embedding fan-out |
//! | [`testing`] | Scripted in-memory completion service |

pub mod api;
pub mod cache;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod input;
pub mod prelude;
pub mod scripts;
pub mod session;
pub mod testing;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the OpenAI-compatible API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default model for all completion calls (8k token context).
pub const DEFAULT_MODEL: &str = "gpt-4";

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation. Never mutated once built.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    pub temperature: f32,
}

impl ChatRequest {
    /// Streaming request at the API's default temperature.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            temperature: 1.0,
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Check that a sampling temperature lies in `0.0..=2.0`.
///
/// Run this before building any client so a bad flag fails without touching
/// the network.
pub fn validate_temperature(temperature: f32) -> Result<f32> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(temperature)
    } else {
        Err(Error::InvalidTemperature(temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content, "hello");

        assert_eq!(Message::user("world").role, MessageRole::User);
        assert_eq!(Message::assistant("hi").role, MessageRole::Assistant);
    }

    #[test]
    fn message_serializes_to_wire_shape() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn chat_request_carries_stream_and_temperature() {
        let req = ChatRequest::new("gpt-4", vec![Message::user("hi")])
            .with_stream(false)
            .with_temperature(0.2);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["stream"], false);
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        assert!(validate_temperature(0.0).is_ok());
        assert!(validate_temperature(2.0).is_ok());
        assert!(matches!(
            validate_temperature(2.5),
            Err(Error::InvalidTemperature(_))
        ));
        assert!(validate_temperature(-0.1).is_err());
        assert!(validate_temperature(f32::NAN).is_err());
    }
}
