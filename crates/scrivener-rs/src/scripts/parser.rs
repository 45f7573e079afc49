//! Extraction of named code artifacts from a markdown completion.
//!
//! The parser walks the completion line by line with two states. Outside a
//! block, a heading that names a file (`# plot_prices.py`) sets the name of
//! the next artifact and a fence (```` ``` ```` or ```` ```python ````) opens
//! a block. Inside a block every line is kept verbatim until a bare fence
//! closes it.
//!
//! Transitions live in one table, so supporting another fence or
//! heading convention means adding a [`LineClass`] and its rows rather than
//! restructuring the loop.

use crate::scripts::analysis::{find_functions, is_notebook};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

/// What an artifact should be saved as.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Script,
    Notebook,
}

impl ArtifactKind {
    /// File extension, dot included.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Script => ".py",
            ArtifactKind::Notebook => ".ipynb",
        }
    }
}

/// One code block pulled out of a completion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    /// Unique within its batch, without extension.
    pub name: String,
    /// Block content exactly as it appeared between the fences.
    pub body: String,
    pub kind: ArtifactKind,
    /// Top-level functions defined in `body`, in order.
    pub function_names: Vec<String>,
}

/// Recognized headings, fences and notebook markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactGrammar {
    /// Extensions that make a heading an artifact name.
    pub extensions: Vec<String>,
    /// Body substrings that mark an artifact as a notebook.
    pub notebook_signatures: Vec<String>,
}

impl Default for ArtifactGrammar {
    fn default() -> Self {
        Self {
            extensions: vec![".py".into(), ".ipynb".into()],
            notebook_signatures: vec![
                "import matplotlib.pyplot as plt".into(),
                "import pandas as pd".into(),
            ],
        }
    }
}

impl ArtifactGrammar {
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into());
        self
    }

    pub fn with_notebook_signature(mut self, signature: impl Into<String>) -> Self {
        self.notebook_signatures.push(signature.into());
        self
    }

    /// The artifact name a heading line declares, if any.
    fn heading_name<'l>(&self, line: &'l str) -> Option<&'l str> {
        let title = line.trim_start_matches('#');
        if title.len() == line.len() {
            return None;
        }
        let title = title.strip_prefix(' ')?;
        self.extensions
            .iter()
            .find_map(|ext| title.strip_suffix(ext.as_str()))
            .filter(|name| !name.trim().is_empty())
    }

    /// Remove every trailing known extension (`a.ipynb.py` -> `a`).
    fn strip_extensions<'n>(&self, mut name: &'n str) -> &'n str {
        while let Some(stripped) = self
            .extensions
            .iter()
            .find_map(|ext| name.strip_suffix(ext.as_str()))
        {
            name = stripped;
        }
        name
    }

    fn classify(&self, line: &str) -> LineClass {
        let trimmed = line.trim_end();
        if let Some(tag) = trimmed.strip_prefix("```") {
            let tag = tag.trim();
            if tag.is_empty() {
                return LineClass::BareFence;
            }
            if tag.contains('`') {
                return LineClass::Other;
            }
            return LineClass::TaggedFence;
        }
        if self.heading_name(trimmed).is_some() {
            LineClass::Heading
        } else {
            LineClass::Other
        }
    }
}

// ── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    OutsideBlock,
    InsideBlock,
}

/// How a line is treated, independent of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// `#+ <name><known extension>`
    Heading,
    /// ```` ``` ````
    BareFence,
    /// ```` ```python ````
    TaggedFence,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    SetPendingName,
    OpenBlock,
    Finalize,
    Append,
    Skip,
}

use Action::*;
use LineClass::*;
use ParserState::*;

/// `(state, line class) -> (action, next state)`.
const TRANSITIONS: &[(ParserState, LineClass, Action, ParserState)] = &[
    (OutsideBlock, Heading, SetPendingName, OutsideBlock),
    (OutsideBlock, BareFence, OpenBlock, InsideBlock),
    (OutsideBlock, TaggedFence, OpenBlock, InsideBlock),
    (OutsideBlock, Other, Skip, OutsideBlock),
    (InsideBlock, BareFence, Finalize, OutsideBlock),
    (InsideBlock, TaggedFence, Append, InsideBlock),
    (InsideBlock, Heading, Append, InsideBlock),
    (InsideBlock, Other, Append, InsideBlock),
];

fn transition(state: ParserState, class: LineClass) -> (Action, ParserState) {
    TRANSITIONS
        .iter()
        .find(|(s, c, _, _)| *s == state && *c == class)
        .map(|(_, _, action, next)| (*action, *next))
        .unwrap_or((Skip, state))
}

/// Incremental artifact extractor for one completion.
#[derive(Debug)]
pub struct ArtifactParser<'g> {
    grammar: &'g ArtifactGrammar,
    state: ParserState,
    pending_name: String,
    body: Vec<String>,
    taken: HashSet<String>,
    finalized: Vec<ScriptArtifact>,
}

impl<'g> ArtifactParser<'g> {
    pub fn new(grammar: &'g ArtifactGrammar) -> Self {
        Self {
            grammar,
            state: OutsideBlock,
            pending_name: default_name(1),
            body: Vec::new(),
            taken: HashSet::new(),
            finalized: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feed one line (without its trailing `\n`).
    pub fn push_line(&mut self, line: &str) {
        let class = self.grammar.classify(line);
        let (action, next) = transition(self.state, class);
        trace!("{:?} + {class:?} -> {action:?}, {next:?}", self.state);
        match action {
            SetPendingName => {
                if let Some(name) = self.grammar.heading_name(line.trim_end()) {
                    self.pending_name = name.trim().to_string();
                }
            }
            OpenBlock => self.body.clear(),
            Finalize => self.finalize(),
            Append => self.body.push(line.to_string()),
            Skip => {}
        }
        self.state = next;
    }

    /// Artifacts closed so far. A block still open is dropped.
    pub fn finish(self) -> Vec<ScriptArtifact> {
        if self.state == InsideBlock {
            debug!(
                "Dropping unterminated block '{}' ({} line(s))",
                self.pending_name,
                self.body.len()
            );
        }
        self.finalized
    }

    fn finalize(&mut self) {
        let base = self.grammar.strip_extensions(&self.pending_name).to_string();
        let name = self.unique_name(base);
        let body = std::mem::take(&mut self.body).join("\n");
        let kind = if is_notebook(&body, &self.grammar.notebook_signatures) {
            ArtifactKind::Notebook
        } else {
            ArtifactKind::Script
        };
        let function_names = find_functions(&body);
        debug!(
            "Extracted {kind:?} '{name}' ({} function(s))",
            function_names.len()
        );

        self.taken.insert(name.clone());
        self.finalized.push(ScriptArtifact {
            name,
            body,
            kind,
            function_names,
        });
        self.pending_name = default_name(self.finalized.len() + 1);
    }

    /// `base`, or `base_2`, `base_3`, ... when taken.
    fn unique_name(&self, base: String) -> String {
        if !self.taken.contains(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or(base)
    }
}

fn default_name(n: usize) -> String {
    format!("script_{n}")
}

/// Extract every closed code block from `completion`.
pub fn parse_artifacts(completion: &str, grammar: &ArtifactGrammar) -> Vec<ScriptArtifact> {
    let mut parser = ArtifactParser::new(grammar);
    for line in completion.split('\n') {
        parser.push_line(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ScriptArtifact> {
        parse_artifacts(text, &ArtifactGrammar::default())
    }

    #[test]
    fn heading_names_the_next_block() {
        let text = "Here is the plan.\n\n# fib.py\n\n```python\ndef fib(n):\n    return n\n```\n";
        let artifacts = parse(text);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "fib");
        assert_eq!(artifacts[0].body, "def fib(n):\n    return n");
        assert_eq!(artifacts[0].kind, ArtifactKind::Script);
        assert_eq!(artifacts[0].function_names, vec!["fib"]);
    }

    #[test]
    fn duplicate_names_get_numeric_suffixes() {
        let text = "## a.py\n```\nx = 1\n```\n## a.py\n```python\n  y = 2\n```\n## a.ipynb\n```\nz\n```";
        let artifacts = parse(text);
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a_2", "a_3"]);
        assert_eq!(artifacts[0].body, "x = 1");
        assert_eq!(artifacts[1].body, "  y = 2");
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        let text = "# a_2.py\n```\n1\n```\n# a.py\n```\n2\n```\n# a.py\n```\n3\n```";
        let names: Vec<String> = parse(text).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["a_2", "a", "a_3"]);
    }

    #[test]
    fn unnamed_blocks_count_up_from_finalized() {
        let text = "```\na\n```\n# named.py\n```\nb\n```\n```\nc\n```";
        let names: Vec<String> = parse(text).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["script_1", "named", "script_3"]);
    }

    #[test]
    fn default_name_collision_is_suffixed() {
        let text = "# script_2.py\n```\na\n```\n```\nb\n```";
        let names: Vec<String> = parse(text).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["script_2", "script_2_2"]);
    }

    #[test]
    fn block_content_is_verbatim() {
        let body = "# comment.py\n```python\n\tindented\n    # heading-like.py\n\n";
        let text = format!("```\n{body}```");
        let artifacts = parse(&text);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].body, body.trim_end_matches('\n').to_string() + "\n");
    }

    #[test]
    fn notebook_signature_sets_kind() {
        let notebook = parse("```python\nimport pandas as pd\ndf = pd.DataFrame()\n```");
        let script = parse("```python\ndf = pd.DataFrame()\n```");
        assert_eq!(notebook[0].kind, ArtifactKind::Notebook);
        assert_eq!(script[0].kind, ArtifactKind::Script);
    }

    #[test]
    fn unterminated_block_is_dropped() {
        let artifacts = parse("```\ndone\n```\n```\nnever closed");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].body, "done");
    }

    #[test]
    fn headings_without_known_extension_are_prose() {
        let artifacts = parse("# Plan\n## notes.txt\n```\nx\n```");
        assert_eq!(artifacts[0].name, "script_1");
    }

    #[test]
    fn grammar_extensions_are_configurable() {
        let grammar = ArtifactGrammar::default().with_extension(".pyw");
        let artifacts = parse_artifacts("# gui.pyw\n```\nx\n```", &grammar);
        assert_eq!(artifacts[0].name, "gui");
    }

    #[test]
    fn transition_table_covers_every_pair() {
        for state in [OutsideBlock, InsideBlock] {
            for class in [Heading, BareFence, TaggedFence, Other] {
                assert!(
                    TRANSITIONS.iter().any(|(s, c, _, _)| *s == state && *c == class),
                    "missing {state:?} + {class:?}"
                );
            }
        }
    }

    #[test]
    fn crlf_fences_are_recognized() {
        let artifacts = parse("# w.py\r\n```python\r\nprint(1)\r\n```\r\n");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "w");
        assert_eq!(artifacts[0].body, "print(1)\r");
    }
}
