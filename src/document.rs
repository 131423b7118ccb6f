//! Character-indexed document model.
//!
//! Formatting results are expressed against a [`TextDocument`]: something that
//! can hand out its full text and convert between character offsets and
//! line/column positions. Editors implement the trait over their own buffers;
//! [`SourceDocument`] is the in-memory implementation used by the CLI.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Zero-based line and character (Unicode scalar value) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Half-open range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// The host document seen by the formatting pipeline.
pub trait TextDocument {
    /// Full document text.
    fn text(&self) -> &str;

    /// File backing the document, if any. Untitled buffers return `None`.
    fn path(&self) -> Option<&Path>;

    /// Position of a character offset. Offsets past the end clamp to the end.
    fn position_at(&self, offset: usize) -> Position;

    /// Character offset of a position, clamped to the document.
    fn offset_at(&self, position: Position) -> usize;
}

/// In-memory document with a precomputed line index.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: Option<PathBuf>,
    text: String,
    /// Character offset of the first character of each line.
    line_starts: Vec<usize>,
    char_len: usize,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        let mut char_len = 0;
        for ch in text.chars() {
            char_len += 1;
            if ch == '\n' {
                line_starts.push(char_len);
            }
        }
        Self {
            path: None,
            text,
            line_starts,
            char_len,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Read a document from disk.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(text).with_path(path))
    }

    /// Number of characters in the document.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Character length of a line, excluding its `\n` terminator.
    fn line_len(&self, line: usize) -> usize {
        let start = self.line_starts[line];
        match self.line_starts.get(line + 1) {
            Some(next) => next - start - 1,
            None => self.char_len - start,
        }
    }
}

impl TextDocument for SourceDocument {
    fn text(&self) -> &str {
        &self.text
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.char_len);
        // line_starts[0] == 0, so partition_point is at least 1
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        Position::new(line, offset - self.line_starts[line])
    }

    fn offset_at(&self, position: Position) -> usize {
        if position.line >= self.line_starts.len() {
            return self.char_len;
        }
        self.line_starts[position.line] + position.character.min(self.line_len(position.line))
    }
}
