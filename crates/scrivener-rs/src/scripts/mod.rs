//! Code artifacts extracted from completions.
//!
//! - [`parser`]: the two-state line parser that turns a markdown completion
//!   into uniquely named [`ScriptArtifact`]s.
//! - [`analysis`]: notebook classification, function discovery, and test
//!   file naming for the follow-up prompt.
//! - [`render`]: path sanitizing and script/notebook serialization.
//! - [`markdown`]: dedenting of prompt templates.

pub mod analysis;
pub mod markdown;
pub mod parser;
pub mod render;

pub use analysis::{find_functions, is_notebook, test_file_names, test_files_sentence};
pub use markdown::remove_leading_whitespace;
pub use parser::{ArtifactGrammar, ArtifactKind, ArtifactParser, ScriptArtifact, parse_artifacts};
pub use render::{render_notebook, render_script, safe_filepath, save_artifacts};
