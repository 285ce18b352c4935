//! Indentation-aware text buffer for brace-delimited source code.
//!
//! Blocks are opened through [`EmissionBuffer::open_block`], which returns a
//! [`Block`] guard. Dropping the guard writes the closing brace and restores
//! the previous depth, so nesting stays balanced on every exit path.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::ScriptContextError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Line terminator used for every emitted line.
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[derive(Debug)]
/// Growable text with a current indentation depth.
pub struct EmissionBuffer {
    out: String,
    depth: usize,
    indent_unit: String,
    newline: &'static str,
}

impl EmissionBuffer {
    pub fn new(indent_unit: impl Into<String>, line_ending: LineEnding) -> Self {
        Self {
            out: String::new(),
            depth: 0,
            indent_unit: indent_unit.into(),
            newline: line_ending.as_str(),
        }
    }

    /// Writes an indented line.
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.push_indent();
        self.out.push_str(text);
        self.out.push_str(self.newline);
        self
    }

    /// Writes an empty line without indentation.
    pub fn blank(&mut self) -> &mut Self {
        self.out.push_str(self.newline);
        self
    }

    /// Writes indented text without terminating the line.
    pub fn append(&mut self, text: &str) -> &mut Self {
        self.push_indent();
        self.out.push_str(text);
        self
    }

    /// Writes text verbatim.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    /// Writes `{` on its own line and enters a nested block.
    pub fn open_block(&mut self) -> Block<'_> {
        self.line("{");
        self.depth += 1;
        Block { buffer: self }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Returns the accumulated text, failing if any block is still open.
    pub fn finish(self) -> Result<String, ScriptContextError> {
        if self.depth != 0 {
            return Err(ScriptContextError::UnbalancedBlock { depth: self.depth });
        }
        Ok(self.out)
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(&self.indent_unit);
        }
    }
}

/// An open `{ ... }` block. Closes itself when dropped.
#[must_use = "dropping a block immediately closes it"]
pub struct Block<'a> {
    buffer: &'a mut EmissionBuffer,
}

impl Deref for Block<'_> {
    type Target = EmissionBuffer;

    fn deref(&self) -> &EmissionBuffer {
        self.buffer
    }
}

impl DerefMut for Block<'_> {
    fn deref_mut(&mut self) -> &mut EmissionBuffer {
        self.buffer
    }
}

impl Drop for Block<'_> {
    fn drop(&mut self) {
        self.buffer.depth -= 1;
        self.buffer.line("}");
    }
}
