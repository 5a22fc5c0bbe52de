//! Diagnostic collection and the public error type.
//!
//! The scanner and parser share a [`DiagnosticSink`]: the scanner reports
//! lexical problems through it as they are encountered, and the parser records
//! syntax and macro failures. The parser latches the first fatal entry and
//! surfaces it as a [`TankaError`] with a labeled source span; the full sink
//! stays available to callers that want to inspect everything that was
//! reported.

use std::cell::RefCell;
use std::rc::Rc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::span::Span;

// ============================================================================
// SECTION: recorded diagnostics
// ============================================================================

/// Where in the front end a diagnostic originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The scanner could not form a token.
    Lex,
    /// A grammar rule failed with no way to continue.
    Parse,
    /// A malformed `macro` definition.
    MacroDefinition,
    /// A macro call that cannot be resolved against its definition.
    MacroCall,
    /// A pattern matched but its template could not be expanded.
    MacroExpansion,
}

/// One reported failure: the category, the index of the token the parser was
/// looking at, the source region, and a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub kind: DiagnosticKind,
    pub token_index: usize,
    pub span: Span,
    pub message: String,
}

/// Ordered record of every diagnostic reported during one parse.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Vec<ParseDiagnostic>,
}

impl DiagnosticSink {
    pub fn report(&mut self, diagnostic: ParseDiagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[ParseDiagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The sink is shared between the scanner's error callback and the parser.
pub type SharedSink = Rc<RefCell<DiagnosticSink>>;

// ============================================================================
// SECTION: public error type
// ============================================================================

/// A fatal front-end failure, carrying the source it points into.
#[derive(Debug, Error, Diagnostic)]
pub enum TankaError {
    #[error("{message}")]
    #[diagnostic(code(tanka::lex))]
    Lex {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(tanka::parse))]
    Parse {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("{message}")]
    #[diagnostic(
        code(tanka::macros::definition),
        help("macro definitions have the form `macro name {{ (pattern) : (template) }}`")
    )]
    MacroDefinition {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(tanka::macros::call))]
    MacroCall {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(tanka::macros::expansion))]
    MacroExpansion {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
        #[source_code]
        source_code: NamedSource<String>,
    },

    #[error("failed to read {path}")]
    #[diagnostic(code(tanka::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TankaError {
    /// Attach source text to a recorded diagnostic, producing the rich error.
    pub fn from_diagnostic(
        diagnostic: &ParseDiagnostic,
        source_name: &str,
        source_text: &str,
    ) -> Self {
        let source_code = NamedSource::new(source_name, source_text.to_string());
        let span: SourceSpan = diagnostic.span.into();
        let message = diagnostic.message.clone();
        match diagnostic.kind {
            DiagnosticKind::Lex => TankaError::Lex {
                message,
                span,
                source_code,
            },
            DiagnosticKind::Parse => TankaError::Parse {
                message,
                span,
                source_code,
            },
            DiagnosticKind::MacroDefinition => TankaError::MacroDefinition {
                message,
                span,
                source_code,
            },
            DiagnosticKind::MacroCall => TankaError::MacroCall {
                message,
                span,
                source_code,
            },
            DiagnosticKind::MacroExpansion => TankaError::MacroExpansion {
                message,
                span,
                source_code,
            },
        }
    }
}
