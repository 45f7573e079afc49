//! Terminal front ends powered by scrivener-rs.
//!
//! Three binaries share this library:
//!
//! - `eternal-chat`: an unbounded chat that compacts its own context and
//!   resumes from disk.
//! - `script-writer`: asks the model for Python scripts, saves the code
//!   blocks of the answer, and follows up with a request for unit tests.
//! - `embed-words`: embeds a list of words concurrently.
//!
//! ```sh
//! # Continue the last chat in ./data/chats/<timestamp>
//! eternal-chat --save-dir-path data/chats/2024-05-01_10-00-00.000Z
//!
//! # Document an existing script
//! script-writer --script tools/report.py --comment-lines --add-docstrings
//! ```

pub mod config;
pub mod prompt;
pub mod terminal;

pub use config::{ChatConfig, ScriptConfig, run_dir_under};
