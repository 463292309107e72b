/*!
# Source position types (Position, PackedSpan)

Centralized location types shared by the tree, the alignment engine and diagnostics.
Lines and byte columns are 0-based; geometry widths are measured in characters.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // человекочитаемый формат: строки и колонки с единицы
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Compact span representation (offset + length) within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedSpan {
    pub start: u32,
    pub len: u32,
}

impl PackedSpan {
    pub fn new(start: u32, len: u32) -> Self { Self { start, len } }
    pub fn end(&self) -> u32 { self.start + self.len }

    /// Span covering `[start, end)` byte offsets.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self::new(start as u32, end.saturating_sub(start) as u32)
    }

    /// Smallest span covering both.
    pub fn cover(self, other: PackedSpan) -> Self {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        Self::new(start, end - start)
    }

    pub fn range(&self) -> Range<usize> { self.start as usize..self.end() as usize }
}

/// Width of a text fragment in characters (the unit of every column and line length).
pub fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Line index for fast offset->(line,column) mapping.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts.
    line_starts: Arc<Vec<u32>>, // Arc для дешёвого клонирования
    text_len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = Vec::with_capacity(text.len() / 32 + 1);
        starts.push(0u32);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' { starts.push((i + 1) as u32); }
        }
        Self { line_starts: Arc::new(starts), text_len: text.len() as u32 }
    }

    pub fn line_count(&self) -> usize { self.line_starts.len() }

    /// 0-based line containing `offset`.
    pub fn line_of(&self, offset: u32) -> usize {
        // Бинарный поиск последнего line_start <= offset
        let starts = &self.line_starts;
        let mut lo = 0usize;
        let mut hi = starts.len();
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if starts[mid] <= offset { lo = mid; } else { hi = mid; }
        }
        lo
    }

    pub fn to_position(&self, offset: u32) -> Position {
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        Position::new(line, (offset - line_start) as usize, offset as usize)
    }


    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(self.text_len) as usize
    }

    /// Byte range of `line` without its terminating newline.
    pub fn line_range(&self, text: &str, line: usize) -> Range<usize> {
        let start = self.line_start(line);
        let mut end = match self.line_starts.get(line + 1) {
            Some(next) => *next as usize - 1,
            None => self.text_len as usize,
        };
        if end > start && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
        start..end
    }

    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> &'a str {
        &text[self.line_range(text, line)]
    }

    /// Width in characters of `line`.
    pub fn line_width(&self, text: &str, line: usize) -> usize {
        display_width(self.line_text(text, line))
    }

    /// Leading whitespace width of `line`, in characters.
    pub fn indentation(&self, text: &str, line: usize) -> usize {
        self.line_text(text, line).chars().take_while(|c| *c == ' ' || *c == '\t').count()
    }

    /// Character column of `offset` within its line.
    pub fn char_column(&self, text: &str, offset: usize) -> usize {
        let line = self.line_of(offset as u32);
        display_width(&text[self.line_start(line)..offset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_basic() {
        let text = "line1\nline2\nlast";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_count(), 3);
        let p = idx.to_position(7); // 'i' in line2
        assert_eq!(p.line, 1);
        assert_eq!(p.column, 1);
    }

    #[test]
    fn test_line_text_strips_crlf() {
        let text = "  foo\r\nbar";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_text(text, 0), "  foo");
        assert_eq!(idx.indentation(text, 0), 2);
        assert_eq!(idx.line_text(text, 1), "bar");
    }

    #[test]
    fn test_char_column_counts_characters() {
        let text = "é = 1\nx";
        let idx = LineIndex::new(text);
        // 'é' занимает два байта, но одну колонку
        assert_eq!(idx.char_column(text, 3), 2);
        assert_eq!(idx.line_width(text, 0), 5);
    }

    #[test]
    fn test_cover() {
        let a = PackedSpan::new(4, 2);
        let b = PackedSpan::new(1, 1);
        assert_eq!(a.cover(b), PackedSpan::new(1, 5));
    }
}
