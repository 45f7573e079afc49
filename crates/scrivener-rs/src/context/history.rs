//! Conversation persistence.
//!
//! Every turn writes the full history twice: once to an immutable
//! `messages_<timestamp>.json` snapshot and once over `messages.json`, the
//! file a later run resumes from. Both are plain writes; a crash between the
//! two can leave them disagreeing.
//!
//! ```text
//! save_dir/
//!   messages.json
//!   messages_2024-05-01_12-00-00.123Z.json
//!   messages_2024-05-01_12-03-10.456Z.json
//! ```

use crate::{Error, Message, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LATEST_FILE: &str = "messages.json";

/// UTC timestamp safe for use in file and directory names.
pub fn fs_safe_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d_%H-%M-%S%.3fZ")
        .to_string()
}

/// Reads and writes conversation logs in one directory.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the canonical "latest" file.
    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// Load the latest history. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<Message>> {
        let path = self.latest_path();
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No saved conversation at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        let history: Vec<Message> = serde_json::from_str(&json)
            .map_err(|e| Error::Json(format!("malformed history {}: {e}", path.display())))?;
        debug!("Loaded {} message(s) from {}", history.len(), path.display());
        Ok(history)
    }

    /// Write a timestamped snapshot, then overwrite the latest file.
    /// Returns the snapshot path.
    pub fn save(&self, history: &[Message]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let json = serde_json::to_string_pretty(history)?;

        let snapshot = self
            .dir
            .join(format!("messages_{}.json", fs_safe_timestamp()));
        std::fs::write(&snapshot, &json).map_err(|e| Error::io(&snapshot, e))?;

        let latest = self.latest_path();
        std::fs::write(&latest, &json).map_err(|e| Error::io(&latest, e))?;

        debug!(
            "Saved {} message(s) to {}",
            history.len(),
            snapshot.display()
        );
        Ok(snapshot)
    }
}
