//! Convenience re-exports for common `scrivener-rs` types.
//!
//! ```ignore
//! use scrivener_rs::prelude::*;
//! ```
//!
//! Covers the client, the session, the cache, the context window manager
//! and artifact extraction. SSE decoding, digests and rendering helpers stay
//! in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ChatRequest, DEFAULT_MODEL, Error, Message, MessageRole, Result, validate_temperature,
};

// ── Remote service ──────────────────────────────────────────────────
pub use crate::api::{
    BackoffPolicy, CompletionService, HttpCompletionClient, RetryConfig, RetryingClient,
    StreamAccumulator, StreamChunk,
};
pub use crate::session::{CompletionSession, Exchange};

// ── Cache ───────────────────────────────────────────────────────────
pub use crate::cache::{CachedCompletion, CompletionCache, RequestKey};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    ContextWindowManager, HistoryStore, TokenAccountant, TurnEvent, WindowConfig,
};

// ── Artifacts ───────────────────────────────────────────────────────
pub use crate::scripts::{ArtifactGrammar, ArtifactKind, ScriptArtifact, parse_artifacts};

// ── Input ───────────────────────────────────────────────────────────
pub use crate::input::{MultilineReader, is_exit};
