//! Tanka is a small language front end: a scanner, a recursive-descent
//! parser, and a declarative macro system in the `macro_rules` style.
//!
//! Macros are declared as a list of `(pattern) : (template)` rules. Calls
//! like `name!( ... )` are matched against each pattern in order; the first
//! pattern that accepts the arguments has its template expanded, and the
//! resulting tokens are spliced back into the stream for the parser to
//! re-read.
//!
//! ```
//! let source = "
//!     macro double { ($x:expr) : ($x + $x) }
//!     var total = double!(7)
//! ";
//! let file = tanka::parse("demo.tk", source).unwrap();
//! assert_eq!(file.body.len(), 2);
//! ```

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod parser;
pub mod scanner;
pub mod span;

pub use diagnostics::{DiagnosticKind, ParseDiagnostic, TankaError};
pub use parser::{expand_source, Parser};
pub use span::{Position, Span};

/// Parse a source string into a file AST, failing on the first diagnostic.
pub fn parse(source_name: &str, source: &str) -> Result<ast::File, TankaError> {
    Parser::new(source).parse_file(source_name)
}

/// Parse a source string, returning the partial AST and every diagnostic.
pub fn parse_with_diagnostics(source: &str) -> (ast::File, Vec<ParseDiagnostic>) {
    Parser::new(source).parse_with_diagnostics()
}
