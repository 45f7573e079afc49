//! Line input with an explicit multi-line mode.
//!
//! A line ending in `<<EOF` switches to accumulation: every following line
//! is collected until one that is exactly `EOF`, and the lines are joined
//! with `\n`. End of input on the first read yields `"exit"`; end of input
//! while accumulating ends the block as if `EOF` had been typed.

use crate::{Error, Result};
use std::io::BufRead;

pub const CONTINUATION_MARKER: &str = "<<EOF";
pub const TERMINATOR: &str = "EOF";
/// Input value that ends an interactive loop.
pub const EXIT_COMMAND: &str = "exit";

/// Exact match only: `"exit "` is an ordinary prompt.
pub fn is_exit(input: &str) -> bool {
    input == EXIT_COMMAND
}

pub struct MultilineReader<R> {
    reader: R,
}

impl MultilineReader<std::io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> MultilineReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read one input value.
    pub fn read_prompt(&mut self) -> Result<String> {
        let Some(first) = self.read_line()? else {
            return Ok(EXIT_COMMAND.to_string());
        };
        let Some(head) = first.strip_suffix(CONTINUATION_MARKER) else {
            return Ok(first);
        };

        let mut lines = Vec::new();
        if !head.is_empty() {
            lines.push(head.to_string());
        }
        while let Some(line) = self.read_line()? {
            if line == TERMINATOR {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    /// Next line without its line ending, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| Error::io("<input>", e))?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
