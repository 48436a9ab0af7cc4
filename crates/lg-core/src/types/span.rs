//! Byte spans and line/column conversion.
//!
//! Everything the parser and analyzer produce is located by a byte [`Span`] into the
//! document text. Editors speak in lines and UTF-16 columns, so [`LineIndex`] does the
//! translation at the protocol boundary.

use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

/// Half-open byte range `[start, end)` into a document's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end: end.max(start) }
    }

    /// Shifts a range relative to some base offset into an absolute span.
    pub fn from_relative(base: usize, range: &Range<usize>) -> Self {
        Self::new(base + range.start, base + range.end)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends so a cursor sitting right after a token still hits it.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn cover(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Zero-based line and UTF-16 column, as used by the editor protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub character: u32,
}

impl LineCol {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Offsets of line starts for one version of a document. The text itself is shared
/// with whoever owns the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    text: Arc<str>,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self::shared(Arc::from(text))
    }

    /// Indexes `text` without copying it.
    pub fn shared(text: Arc<str>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of a line without its terminator.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = self.line_starts.get(line + 1).map(|next| next - 1).unwrap_or(self.text.len());
        self.text.get(start..end).map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    /// Converts a byte offset to a line and UTF-16 column. Offsets past the end clamp to
    /// the end of the document.
    pub fn position(&self, offset: usize) -> LineCol {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let character = self.text[start..offset].encode_utf16().count();
        LineCol::new(line as u32, character as u32)
    }

    /// Converts a line and UTF-16 column back to a byte offset. Columns past the end of the
    /// line clamp to the line end; lines past the end of the document yield `None`.
    pub fn offset(&self, position: LineCol) -> Option<usize> {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return if line == self.line_starts.len() && position.character == 0 {
                Some(self.text.len())
            } else {
                None
            };
        }
        let start = self.line_starts[line];
        let line_text = self.line_text(line)?;
        let mut utf16 = 0u32;
        for (idx, ch) in line_text.char_indices() {
            if utf16 >= position.character {
                return Some(start + idx);
            }
            utf16 += ch.len_utf16() as u32;
        }
        Some(start + line_text.len())
    }

    pub fn range(&self, span: Span) -> (LineCol, LineCol) {
        (self.position(span.start), self.position(span.end))
    }
}
