//! Source positions and spans.
//!
//! Every token and AST node carries a `Span`; diagnostics convert spans into
//! `miette::SourceSpan`s so errors render with labeled source excerpts.

use miette::SourceSpan;
use serde::Serialize;

/// A point in the source text. Lines and columns are 1-based and meant for
/// humans; `offset` is the byte offset used for diagnostic rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

/// A half-open region of source text, `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// The smallest span covering both `a` and `b`.
    pub fn between(a: Span, b: Span) -> Self {
        Span {
            start: a.start,
            end: b.end,
        }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        // Zero-length spans still get a one-byte label so the caret is visible.
        (span.start.offset, span.len().max(1)).into()
    }
}
