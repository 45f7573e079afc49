//! Front-end configuration with sensible defaults.
//!
//! [`ChatConfig`] and [`ScriptConfig`] collect what the binaries parse from
//! their flags and turn it into scrivener-rs types: a validated
//! [`CompletionSession`], a [`WindowConfig`], the cache and run directories.

use std::path::{Path, PathBuf};

use scrivener_rs::context::fs_safe_timestamp;
use scrivener_rs::prelude::*;

/// Root of everything the binaries write. Default: `./data`.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Fresh timestamped directory under `parent`. Not created yet.
pub fn run_dir_under(parent: &Path) -> PathBuf {
    parent.join(fs_safe_timestamp())
}

/// The key in `OPENAI_API_KEY`.
pub fn api_key() -> Result<String> {
    std::env::var(scrivener_rs::API_KEY_ENV)
        .map_err(|_| Error::MissingApiKey(scrivener_rs::API_KEY_ENV.into()))
}

fn http_client(api_base: Option<&str>) -> Result<HttpCompletionClient> {
    match api_base {
        Some(base) => HttpCompletionClient::with_api_base(api_key()?, base),
        None => HttpCompletionClient::from_env(),
    }
}

/// Settings for an `eternal-chat` session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier. Default: `"gpt-4"`.
    pub model: String,
    /// Sampling temperature. Default: `1.0`.
    pub temperature: f32,
    /// Where the conversation is saved. Default: a new run dir under
    /// `data/chats`.
    pub save_dir: PathBuf,
    /// Override for the API base URL.
    pub api_base: Option<String>,
    /// Start from an empty conversation even if one is saved.
    pub fresh: bool,
    pub window: WindowConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::under(Path::new(DEFAULT_DATA_DIR))
    }
}

impl ChatConfig {
    /// Defaults with a new save directory under `<data_dir>/chats`.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            save_dir: run_dir_under(&data_dir.join("chats")),
            api_base: None,
            fresh: false,
            window: WindowConfig::default(),
        }
    }

    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::new(&self.save_dir)
    }

    /// Validate the temperature, then build the HTTP-backed session.
    pub fn build_session(&self) -> Result<CompletionSession<HttpCompletionClient>> {
        let temperature = validate_temperature(self.temperature)?;
        let client = http_client(self.api_base.as_deref())?;
        Ok(CompletionSession::new(client, &self.model).with_temperature(temperature))
    }

    /// Open the context window, resuming saved history unless `fresh`.
    pub fn open_window(&self) -> Result<ContextWindowManager> {
        ContextWindowManager::open(
            self.history_store(),
            self.fresh,
            self.window.clone(),
            TokenAccountant::for_model(&self.model),
        )
    }
}

/// Settings for a `script-writer` run.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub model: String,
    pub data_dir: PathBuf,
    pub api_base: Option<String>,
    /// Existing script to document instead of writing a new one.
    pub script: Option<PathBuf>,
    pub comment_lines: bool,
    pub add_docstrings: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            api_base: None,
            script: None,
            comment_lines: false,
            add_docstrings: false,
        }
    }
}

impl ScriptConfig {
    pub fn writer_dir(&self) -> PathBuf {
        self.data_dir.join("script_writer")
    }

    /// `<data-dir>/script_writer/all_completions.json`
    pub fn cache_path(&self) -> PathBuf {
        self.writer_dir().join("all_completions.json")
    }

    /// New run dir next to the script being documented, or under the
    /// writer dir for a new script.
    pub fn run_dir(&self) -> PathBuf {
        let parent = self
            .script
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.writer_dir());
        run_dir_under(&parent)
    }

    /// Session with the on-disk completion cache attached.
    pub fn build_session(&self) -> Result<CompletionSession<HttpCompletionClient>> {
        let cache = CompletionCache::load(self.cache_path())?;
        let client = http_client(self.api_base.as_deref())?;
        Ok(CompletionSession::new(client, &self.model).with_cache(cache))
    }
}
