//! Error type shared by every module in the crate.
//!
//! Callers mostly care about three distinctions: a rate limit that survived
//! the retry budget ([`Error::RateLimited`]), a cache key that could not be
//! canonicalized ([`Error::TypeKind`]), and everything else coming back from
//! the remote service or the filesystem.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote service kept rate limiting until the retry budget ran out.
    #[error("rate limit error, giving up after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    /// A non-success HTTP status from the remote service.
    #[error("completion API HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The response stream broke off or could not be read.
    #[error("stream error: {0}")]
    Stream(String),

    /// A cache key contained a value with no canonical serialization.
    #[error("cache key is not canonically serializable: {0}")]
    TypeKind(String),

    /// A cached payload does not have the shape of a response chunk sequence.
    #[error("cached completion {digest} is corrupt: {reason}")]
    CorruptCache { digest: String, reason: String },

    #[error("temperature must be a float between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),

    #[error("{0} environment variable is not set")]
    MissingApiKey(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    /// Whether this error is the remote service's rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::Http { status: 429, .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
