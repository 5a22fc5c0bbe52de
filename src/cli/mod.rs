//! The tanka command-line interface.
//!
//! This module is the entry point for all CLI commands and dispatches to the
//! core library functions. Errors surface as `miette` reports so diagnostics
//! render with source snippets and labels.

use std::fs;
use std::path::Path;

use clap::Parser as _;

use crate::cli::args::{Command, TankaArgs};
use crate::diagnostics::TankaError;
use crate::parser;
use crate::scanner::{Scanner, Token, TokenKind};

pub mod args;
pub mod output;

pub fn run() -> miette::Result<()> {
    let args = TankaArgs::parse();
    match args.command {
        Command::Check { file } => handle_check(&file),
        Command::Ast { file, compact } => handle_ast(&file, compact),
        Command::Tokens { file } => handle_tokens(&file),
        Command::Expand { file } => handle_expand(&file),
    }
}

fn handle_check(path: &Path) -> miette::Result<()> {
    let source = read_source(path)?;
    let file = crate::parse(&source_name(path), &source).map_err(miette::Report::new)?;
    println!("{}: ok ({} top-level items)", path.display(), file.body.len());
    Ok(())
}

fn handle_ast(path: &Path, compact: bool) -> miette::Result<()> {
    let source = read_source(path)?;
    let file = crate::parse(&source_name(path), &source).map_err(miette::Report::new)?;
    output::print_ast(&file, compact)
}

fn handle_tokens(path: &Path) -> miette::Result<()> {
    let source = read_source(path)?;
    // Scanning alone never fails hard; lexical problems come back to the
    // parser through the error hook, so surface them with a full parse.
    crate::parse(&source_name(path), &source).map_err(miette::Report::new)?;

    let mut scanner = Scanner::new(&source);
    let mut tokens: Vec<Token> = Vec::new();
    loop {
        let token = scanner.scan();
        if matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment) {
            continue;
        }
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    output::print_tokens(&tokens);
    Ok(())
}

fn handle_expand(path: &Path) -> miette::Result<()> {
    let source = read_source(path)?;
    let tokens =
        parser::expand_source(&source, &source_name(path)).map_err(miette::Report::new)?;
    output::print_expanded(&tokens);
    Ok(())
}

fn read_source(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .map_err(|source| TankaError::Io {
            path: path.display().to_string(),
            source,
        })
        .map_err(miette::Report::new)
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}
