//! Source span and position tracking for error reporting
//!
//! Spans are byte offsets into a single file. [`SourceFile`] owns the text and
//! a line table so spans can be turned into [`Position`] values on demand.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A span in the source code
///
/// Uses u32 for positions to reduce memory footprint (supports files up to 4GB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset in the source
    pub start: u32,
    /// End byte offset in the source (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Create a span for a single character
    pub fn single(pos: usize) -> Self {
        Self::new(pos, pos + 1)
    }

    /// Get the length of this span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    /// Check if this span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Merge two spans into a single span covering both
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Extract the text for this span from the source
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A resolved location: file, 1-based line and 1-based column.
///
/// Kept structured so callers can render or compare it however they need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// File the position points into, if known
    pub file: Option<PathBuf>,
    /// 1-based line number
    pub line: u32,
    /// 1-based column, counted in characters
    pub column: u32,
}

impl Position {
    /// Create a position inside a file
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
        }
    }

    /// Create a position that is not tied to a file
    pub fn detached(line: u32, column: u32) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file.display(), self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// The text of one configuration file together with its line table.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    /// Wrap `text` read from `path`
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|&(_, ch)| ch == '\n')
                .map(|(i, _)| (i + 1) as u32),
        );
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    /// Path the file was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based line and column for a byte offset
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.text.len() as u32);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line] as usize;
        let column = self
            .text
            .get(line_start..offset as usize)
            .map_or(0, |prefix| prefix.chars().count());
        (line as u32 + 1, column as u32 + 1)
    }

    /// Position of the start of `span` in this file
    pub fn position(&self, span: Span) -> Position {
        let (line, column) = self.line_col(span.start);
        Position::new(self.path.clone(), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
        assert_eq!(merged.len(), 10);
    }

    #[test]
    fn test_span_slice() {
        let source = "hello world";
        assert_eq!(Span::new(0, 5).slice(source), "hello");
        assert_eq!(Span::new(6, 11).slice(source), "world");
        assert_eq!(Span::new(6, 40).slice(source), "");
    }

    #[test]
    fn test_line_col() {
        let file = SourceFile::new("a.cue", "line1\nline2\nline3");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(5), (1, 6));
        assert_eq!(file.line_col(6), (2, 1));
        assert_eq!(file.line_col(14), (3, 3));
    }

    #[test]
    fn test_line_col_counts_characters() {
        let file = SourceFile::new("a.cue", "ä: 1\nö: ü");
        // "ü" starts at byte 10 but is the fourth character of line two
        assert_eq!(file.line_col(10), (2, 4));
    }

    #[test]
    fn test_position_display() {
        let file = SourceFile::new("stacks/web.cue", "a: 1\nb: 2");
        let pos = file.position(Span::new(5, 6));
        assert_eq!(pos.to_string(), "stacks/web.cue:2:1");
        assert_eq!(Position::detached(3, 7).to_string(), "3:7");
    }
}
