//! Context window management for long-running chats.
//!
//! 1. **[`budget`]**: [`TokenAccountant`] counts tokens through a pluggable
//!    [`Tokenizer`] and prices the active window.
//!
//! 2. **[`summarizer`]**: the fixed compaction instruction and the resume
//!    rule that finds it again in a saved history.
//!
//! 3. **[`history`]**: [`HistoryStore`] writes a timestamped snapshot and
//!    the canonical `messages.json` after every turn.
//!
//! 4. **[`window`]**: [`ContextWindowManager`] ties them together. It
//!    compacts at most once per turn and keeps the last few messages.

pub mod budget;
pub mod history;
pub mod summarizer;
pub mod window;

pub use budget::{BpeTokenizer, CharRatioTokenizer, DEFAULT_CHARS_PER_TOKEN, TokenAccountant, Tokenizer};
pub use history::{HistoryStore, fs_safe_timestamp};
pub use summarizer::{COMPACTION_INSTRUCTION, resume_window};
pub use window::{ContextWindowManager, TurnEvent, TurnOutcome, WindowConfig, WindowState};
