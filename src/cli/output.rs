//! User-facing output for the CLI: JSON trees and token listings.

use miette::IntoDiagnostic;

use crate::ast::File;
use crate::scanner::{Token, TokenKind};

/// Serialize a parsed file to JSON on stdout.
pub fn print_ast(file: &File, compact: bool) -> miette::Result<()> {
    let json = if compact {
        serde_json::to_string(file).into_diagnostic()?
    } else {
        serde_json::to_string_pretty(file).into_diagnostic()?
    };
    println!("{json}");
    Ok(())
}

/// Print one token per line as `line:column kind text`.
pub fn print_tokens(tokens: &[Token]) {
    for token in tokens {
        let position = token.span.start;
        println!(
            "{}:{}\t{:?}\t{}",
            position.line, position.column, token.kind, token.text
        );
    }
}

/// Print an expanded token stream as a single line of source text.
pub fn print_expanded(tokens: &[Token]) {
    let text: Vec<&str> = tokens
        .iter()
        .filter(|token| token.kind != TokenKind::Eof)
        .map(|token| token.text.as_str())
        .collect();
    println!("{}", text.join(" "));
}
