//! End-to-end parser tests over the public API.

use tanka::ast::{Expr, Node, Stmt};
use tanka::{parse, parse_with_diagnostics, DiagnosticKind};

fn file_of(source: &str) -> tanka::ast::File {
    parse("test.tk", source).unwrap()
}

fn first_message(source: &str) -> String {
    let (_, diagnostics) = parse_with_diagnostics(source);
    diagnostics
        .first()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| panic!("expected a diagnostic for: {source}"))
}

#[test]
fn parses_a_small_program() {
    let file = file_of(
        "
        var limit = 10

        fn count(start: int = 0) {
            for var i = start; i < limit; i++ {
                total = total + i
            }
        }
        ",
    );
    assert_eq!(file.body.len(), 2);
    assert!(matches!(&file.body[0], Node::Stmt(Stmt::Var(_))));
    let Node::Function(function) = &file.body[1] else {
        panic!("expected a function declaration");
    };
    assert_eq!(function.name.as_ref().unwrap().text, "count");
    assert!(function.parameters[0].default_value.is_some());
    assert_eq!(function.body.body.len(), 1);
}

#[test]
fn parses_grouped_declarations() {
    let file = file_of("const (width = 640, height = 480)");
    let Node::Stmt(Stmt::MultiVar { declarations, .. }) = &file.body[0] else {
        panic!("expected a declaration group");
    };
    assert_eq!(declarations.len(), 2);
    assert!(declarations.iter().all(|d| d.constant));
}

#[test]
fn parses_if_else_chains_and_calls() {
    let file = file_of(
        "
        fn main() {
            if ready() {
                go(speed: 2)
            } else if waiting {
                hold()
            } else {
                stop()
            }
        }
        ",
    );
    let Node::Function(function) = &file.body[0] else {
        panic!("expected a function");
    };
    let Node::Stmt(Stmt::If(statement)) = &function.body.body[0] else {
        panic!("expected an if statement");
    };
    let Expr::Call { arguments, .. } = &statement.condition else {
        panic!("expected a call condition");
    };
    assert!(arguments.is_empty());
    // The else-if chain hangs off the else block.
    let else_block = statement.else_block.as_ref().unwrap();
    assert!(matches!(&else_block.body[0], Node::Stmt(Stmt::If(_))));
}

#[test]
fn declaration_spans_cover_keyword_through_value() {
    let file = file_of("var answer = 42");
    let Node::Stmt(Stmt::Var(declaration)) = &file.body[0] else {
        panic!("expected a variable declaration");
    };
    assert_eq!(declaration.span.start.offset, 0);
    assert_eq!(declaration.span.end.offset, 15);
    assert_eq!(declaration.span.start.line, 1);
    assert_eq!(declaration.span.start.column, 1);
}

#[test]
fn reserved_keyword_as_name_is_an_error() {
    let message = first_message("var if = 1");
    assert!(message.contains("reserved keyword"), "got: {message}");
}

#[test]
fn missing_block_is_an_error() {
    let error = parse("test.tk", "fn broken() var x = 1").unwrap_err();
    assert!(error.to_string().contains("expected a block"), "got: {error}");
}

#[test]
fn unexpected_top_level_token_is_an_error() {
    let message = first_message("fn ok() { }\n)");
    assert!(message.contains("unexpected"), "got: {message}");
}

#[test]
fn lexical_errors_are_reported_with_their_kind() {
    let (_, diagnostics) = parse_with_diagnostics("var s = \"unterminated");
    let first = diagnostics.first().expect("expected a diagnostic");
    assert_eq!(first.kind, DiagnosticKind::Lex);
}

#[test]
fn statements_only_valid_in_blocks_stay_there() {
    // `if` is not a loop clause, so this must fail to parse.
    let (_, diagnostics) = parse_with_diagnostics("fn f() { for if a { }; b; c { } }");
    assert!(!diagnostics.is_empty());
}

#[test]
fn comments_and_whitespace_are_skipped() {
    let file = file_of(
        "
        // leading comment
        var x = 1 /* inline */ + 2
        ",
    );
    let Node::Stmt(Stmt::Var(declaration)) = &file.body[0] else {
        panic!("expected a variable declaration");
    };
    assert!(matches!(declaration.value, Some(Expr::Binary { .. })));
}
