//! Source positions and spans.
//!
//! Offsets are byte offsets into the original source. Every AST node carries
//! a [`SourceSpan`] whose `source` field is the exact slice of the input it
//! covers; transform-synthesized nodes use [`SourceSpan::stub`].

use serde::Serialize;

/// A location in the source text. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Position { offset, line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { offset: 0, line: 1, column: 1 }
    }
}

/// Advances `pos` over the first `by` bytes of `text`, keeping line and
/// column in sync. Used to locate fragments inside an already-spanned slice.
pub fn advance_position(pos: Position, text: &str, by: usize) -> Position {
    let mut out = pos;
    for b in text.as_bytes()[..by].iter() {
        out.offset += 1;
        if *b == b'\n' {
            out.line += 1;
            out.column = 1;
        } else {
            out.column += 1;
        }
    }
    out
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open `[start, end)` range of the source, carrying the covered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

impl SourceSpan {
    pub fn new(start: Position, end: Position, source: String) -> Self {
        SourceSpan { start, end, source }
    }

    /// Span for nodes that have no counterpart in the source text.
    pub fn stub() -> Self {
        SourceSpan {
            start: Position::default(),
            end: Position::default(),
            source: String::new(),
        }
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Newline table for one source text. Maps byte offsets to line/column pairs
/// with a binary search instead of rescanning the input per lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let newlines = source
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(i))
            .collect();
        LineIndex { newlines }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self.newlines.partition_point(|&nl| nl < offset);
        let column = match line {
            0 => offset + 1,
            _ => offset - self.newlines[line - 1],
        };
        Position::new(offset, line as u32 + 1, column as u32)
    }

    pub fn span(&self, source: &str, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new(
            self.position(start),
            self.position(end),
            source[start..end].to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_lookup_across_lines() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.position(0), Position::new(0, 1, 1));
        assert_eq!(index.position(1), Position::new(1, 1, 2));
        assert_eq!(index.position(3), Position::new(3, 2, 1));
        assert_eq!(index.position(6), Position::new(6, 3, 1));
        assert_eq!(index.position(7), Position::new(7, 4, 1));
        assert_eq!(index.position(8), Position::new(8, 4, 2));
    }

    #[test]
    fn span_carries_exact_slice() {
        let source = "<div>hi</div>";
        let index = LineIndex::new(source);
        let span = index.span(source, 5, 7);
        assert_eq!(span.source, "hi");
        assert_eq!(span.start.offset, 5);
        assert_eq!(span.end.offset, 7);
    }
}
