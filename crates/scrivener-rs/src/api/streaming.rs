//! Server-Sent Events (SSE) decoding and stream merging for chat completions.
//!
//! A streamed completion arrives as a sequence of [`StreamChunk`]s shaped like
//! `{"choices":[{"delta":{"content":"..."}}]}`. [`StreamAccumulator`] folds
//! them into a compact chunk list plus the full text, echoing each text
//! fragment to a display callback the moment it is seen.

use crate::Result;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

/// A boxed, sendable stream of response chunks.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// One raw chunk of a streamed response.
///
/// Only `choices[0].delta.content` is interpreted; every other field is
/// carried along untouched so cached payloads replay byte-for-byte.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct StreamChunk(Value);

impl StreamChunk {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// A chunk carrying a text fragment.
    pub fn text(fragment: impl Into<String>) -> Self {
        Self(json!({"choices": [{"delta": {"content": fragment.into()}}]}))
    }

    /// A chunk with an empty delta (role announcements, finish markers).
    pub fn empty() -> Self {
        Self(json!({"choices": [{"delta": {}}]}))
    }

    /// The text fragment carried by this chunk, if any.
    pub fn text_fragment(&self) -> Option<&str> {
        self.0.pointer("/choices/0/delta/content")?.as_str()
    }

    /// Append to this chunk's fragment in place. Returns `false` (and leaves
    /// the chunk alone) when the chunk carries no fragment.
    fn append_fragment(&mut self, more: &str) -> bool {
        match self.0.pointer_mut("/choices/0/delta/content") {
            Some(Value::String(content)) => {
                content.push_str(more);
                true
            }
            _ => false,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Result of merging a chunk sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedStream {
    /// Chunks with consecutive text-bearing runs coalesced into one.
    pub chunks: Vec<StreamChunk>,
    /// Concatenation of every fragment in arrival order.
    pub text: String,
}

/// Incremental merger for response chunks.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    chunks: Vec<StreamChunk>,
    text: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk in. Non-empty fragments go to `on_fragment` right away.
    pub fn push(&mut self, chunk: StreamChunk, on_fragment: &mut impl FnMut(&str)) {
        let Some(fragment) = chunk.text_fragment().map(str::to_owned) else {
            self.chunks.push(chunk);
            return;
        };

        if !fragment.is_empty() {
            on_fragment(&fragment);
        }
        self.text.push_str(&fragment);

        if let Some(last) = self.chunks.last_mut()
            && last.append_fragment(&fragment)
        {
            return;
        }
        self.chunks.push(chunk);
    }

    /// Text seen so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> MergedStream {
        MergedStream {
            chunks: self.chunks,
            text: self.text,
        }
    }
}

/// Drain a live chunk stream, echoing fragments as they arrive.
///
/// The first transport error aborts the merge and is returned as-is.
pub async fn merge<S>(mut stream: S, mut on_fragment: impl FnMut(&str)) -> Result<MergedStream>
where
    S: Stream<Item = Result<StreamChunk>> + Unpin,
{
    let mut acc = StreamAccumulator::new();
    while let Some(chunk) = stream.next().await {
        acc.push(chunk?, &mut on_fragment);
    }
    let merged = acc.finish();
    debug!(
        "Merged stream: {} chunk(s), {} chars",
        merged.chunks.len(),
        merged.text.len()
    );
    Ok(merged)
}

/// Merge an already materialized chunk sequence (e.g. a cache replay).
pub fn merge_chunks(
    chunks: impl IntoIterator<Item = StreamChunk>,
    mut on_fragment: impl FnMut(&str),
) -> MergedStream {
    let mut acc = StreamAccumulator::new();
    for chunk in chunks {
        acc.push(chunk, &mut on_fragment);
    }
    acc.finish()
}

/// Assemble the full text of a chunk sequence without merging it.
pub fn collect_text(chunks: &[StreamChunk]) -> String {
    chunks.iter().filter_map(StreamChunk::text_fragment).collect()
}

// ── SSE decoding ───────────────────────────────────────────────────

/// Line-oriented SSE decoder that tolerates arbitrary network chunking.
///
/// Bytes are buffered until a full line is available so multi-byte UTF-8
/// sequences split across network reads decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `data: [DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning every chunk completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while !self.done
            && let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n')
        {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            self.decode_line(&String::from_utf8_lossy(&line), &mut chunks);
        }
        chunks
    }

    /// Flush whatever remains after the body ends (an unterminated last line).
    pub fn finish(&mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.decode_line(&String::from_utf8_lossy(&rest), &mut chunks);
        }
        chunks
    }

    fn decode_line(&mut self, line: &str, chunks: &mut Vec<StreamChunk>) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }
        if line == "data: [DONE]" {
            trace!("Stream finished with [DONE]");
            self.done = true;
            return;
        }
        if let Some(data) = line.strip_prefix("data: ") {
            match serde_json::from_str::<Value>(data) {
                Ok(value) => chunks.push(StreamChunk(value)),
                Err(e) => warn!("Failed to parse SSE chunk: {e} (data: {data})"),
            }
        }
    }
}
