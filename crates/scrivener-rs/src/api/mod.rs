//! API interaction layer: HTTP client, streaming merge, retry, and pricing.
//!
//! - [`client`]: the [`CompletionService`] seam and the HTTP implementation
//!   for OpenAI-compatible chat completions.
//! - [`streaming`]: SSE decoding plus [`StreamAccumulator`], which coalesces
//!   response chunks and echoes fragments as they arrive.
//! - [`retry`]: bounded retry of rate-limited requests with a swappable
//!   [`BackoffPolicy`].
//! - [`pricing`]: per-model prompt rates for cost estimates.

pub mod client;
pub mod pricing;
pub mod retry;
pub mod streaming;

pub use client::{CompletionService, HttpCompletionClient};
pub use pricing::{ModelPricing, pricing_for_model};
pub use retry::{BackoffPolicy, RetryConfig, RetryingClient};
pub use streaming::{ChunkStream, MergedStream, StreamAccumulator, StreamChunk};
