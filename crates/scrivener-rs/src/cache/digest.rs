//! Canonical serialization and SHA-256 digests for cache keys.
//!
//! A key is serialized to JSON with every object's fields in lexicographic
//! order, then hashed. Two keys that differ only in field order share a
//! digest; any difference in content yields a different one.

use crate::{Error, Message, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest as _, Sha256};

/// Structural cache key for a completion request.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub prompt: String,
    pub prior_messages: Vec<Message>,
}

impl RequestKey {
    pub fn new(prompt: impl Into<String>, prior_messages: &[Message]) -> Self {
        Self {
            prompt: prompt.into(),
            prior_messages: prior_messages.to_vec(),
        }
    }
}

/// Hex-encoded SHA-256 of a canonical key serialization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(String);

impl Digest {
    /// Canonicalize and hash `key`.
    pub fn of<K: Serialize + ?Sized>(key: &K) -> Result<Self> {
        let canonical = canonical_json(key)?;
        Ok(Self(format!("{:x}", Sha256::digest(canonical.as_bytes()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize `key` to compact JSON with sorted object fields.
///
/// Anything serde cannot express as JSON (non-string map keys, a `Serialize`
/// impl that reports a cycle, ...) fails with [`Error::TypeKind`].
pub fn canonical_json<K: Serialize + ?Sized>(key: &K) -> Result<String> {
    let value = serde_json::to_value(key).map_err(|e| Error::TypeKind(e.to_string()))?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::String(name.clone()), out)?;
                out.push(':');
                write_canonical(field, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut String) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|e| Error::TypeKind(e.to_string()))?;
    out.push_str(&text);
    Ok(())
}
