//! Content-addressed completion cache.
//!
//! Maps the [`Digest`] of a canonicalized request to the raw chunk sequence
//! the remote service produced for it. A hit replays those chunks instead of
//! calling the service again, which makes repeated prompts free and
//! deterministic.
//!
//! The cache is loaded once at startup and rewritten in full after every
//! insert. It never evicts or expires entries.

pub mod digest;

pub use digest::{Digest, RequestKey, canonical_json};

use crate::api::streaming::{StreamChunk, collect_text};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A completion as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCompletion {
    /// Raw response chunks, in order.
    pub chunks: Vec<StreamChunk>,
    /// Concatenated text of `chunks`.
    pub text: String,
}

impl CachedCompletion {
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        let text = collect_text(&chunks);
        Self { chunks, text }
    }
}

/// Persistent completion cache keyed by request digest.
#[derive(Debug, Default)]
pub struct CompletionCache {
    /// Backing file. `None` keeps the cache in memory only.
    path: Option<PathBuf>,
    entries: BTreeMap<String, Vec<Value>>,
    hits: u64,
    misses: u64,
}

impl CompletionCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache backed by `path`. A missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str::<BTreeMap<String, Vec<Value>>>(&json).map_err(
                |e| Error::Json(format!("malformed cache file {}: {e}", path.display())),
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No previous completions found at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        debug!("Loaded {} cached completion(s)", entries.len());
        Ok(Self {
            path: Some(path),
            entries,
            hits: 0,
            misses: 0,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a completion is stored for `key`.
    pub fn contains<K: Serialize + ?Sized>(&self, key: &K) -> Result<bool> {
        let digest = Digest::of(key)?;
        Ok(self.entries.contains_key(digest.as_str()))
    }

    /// Look up a stored completion by digest.
    pub fn get(&mut self, digest: &Digest) -> Result<Option<CachedCompletion>> {
        let Some(raw) = self.entries.get(digest.as_str()) else {
            self.misses += 1;
            return Ok(None);
        };
        self.hits += 1;
        let chunks = raw
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if value.is_object() {
                    Ok(StreamChunk::from_value(value.clone()))
                } else {
                    Err(Error::CorruptCache {
                        digest: digest.to_string(),
                        reason: format!("chunk {i} is not a JSON object"),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(CachedCompletion::from_chunks(chunks)))
    }

    /// Return the completion stored for `key`, or run `compute`, store and
    /// persist its result, and return it.
    ///
    /// The key is canonicalized before anything else happens, so a
    /// [`Error::TypeKind`] failure never calls `compute` and never touches
    /// the cache file.
    pub async fn get_or_compute<K, F, Fut>(&mut self, key: &K, compute: F) -> Result<CachedCompletion>
    where
        K: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedCompletion>>,
    {
        let digest = Digest::of(key)?;
        if let Some(hit) = self.get(&digest)? {
            debug!("Completion cache hit: {digest}");
            return Ok(hit);
        }

        debug!("Completion cache miss: {digest}");
        let completion = compute().await?;
        self.insert(&digest, &completion)?;
        Ok(completion)
    }

    /// Store a completion and persist the whole cache.
    ///
    /// If persisting fails the entry is rolled back so memory and disk agree.
    pub fn insert(&mut self, digest: &Digest, completion: &CachedCompletion) -> Result<()> {
        let raw: Vec<Value> = completion
            .chunks
            .iter()
            .map(|c| c.as_value().clone())
            .collect();
        let previous = self.entries.insert(digest.to_string(), raw);
        if let Err(e) = self.persist() {
            match previous {
                Some(prev) => self.entries.insert(digest.to_string(), prev),
                None => self.entries.remove(digest.as_str()),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Write every entry to the backing file, if there is one.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string(&self.entries)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
        debug!(
            "Persisted {} cached completion(s) to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
