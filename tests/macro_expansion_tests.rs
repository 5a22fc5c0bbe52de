//! End-to-end macro definition, matching, and expansion tests.

use tanka::ast::{Expr, Node, Stmt};
use tanka::{expand_source, parse, parse_with_diagnostics};

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

/// The expression initializing the first `var` after any macro definitions.
fn initializer_of(file: &tanka::ast::File) -> &Expr {
    file.body
        .iter()
        .find_map(|node| match node {
            Node::Stmt(Stmt::Var(declaration)) => declaration.value.as_ref(),
            _ => None,
        })
        .expect("expected an initialized variable")
}

#[test]
fn expression_capture_is_substituted() {
    let file = file_of(
        "
        macro double { ($x:expr) : ($x + $x) }
        var total = double!(21)
        ",
    );
    let Expr::Binary { left, right, .. } = initializer_of(&file) else {
        panic!("expected a binary expression");
    };
    assert!(matches!(**left, Expr::Value(ref t) if t.text == "21"));
    assert!(matches!(**right, Expr::Value(ref t) if t.text == "21"));
}

#[test]
fn statement_capture_expands_inside_a_block() {
    let file = file_of(
        "
        macro declare { ($s:stmt) : ($s) }
        fn main() {
            declare!(var flag = true)
        }
        ",
    );
    let Node::Function(function) = &file.body[1] else {
        panic!("expected a function");
    };
    let Node::Stmt(Stmt::Var(declaration)) = &function.body.body[0] else {
        panic!("expected the substituted declaration");
    };
    assert_eq!(declaration.name.text, "flag");
}

#[test]
fn block_capture_expands_as_a_block() {
    let file = file_of(
        "
        macro guarded { ($b:block) : (if armed $b) }
        fn main() {
            guarded!({ fire() })
        }
        ",
    );
    let Node::Function(function) = &file.body[1] else {
        panic!("expected a function");
    };
    let Node::Stmt(Stmt::If(statement)) = &function.body.body[0] else {
        panic!("expected an if statement");
    };
    assert_eq!(statement.then_block.body.len(), 1);
}

#[test]
fn repetition_with_delimiter_expands_each_loop() {
    let file = file_of(
        "
        macro total { ($($x:expr),+) : ($($x +)* 0) }
        var t = total!(1, 2, 3)
        ",
    );
    // Expands to `1 + 2 + 3 + 0`.
    let mut expression = initializer_of(&file);
    let mut leaves = Vec::new();
    while let Expr::Binary { left, right, .. } = expression {
        leaves.push(&**left);
        expression = right.as_ref();
    }
    leaves.push(expression);
    let texts: Vec<&str> = leaves
        .iter()
        .map(|leaf| match leaf {
            Expr::Value(token) => token.text.as_str(),
            other => panic!("expected a value leaf, got {other:?}"),
        })
        .collect();
    assert_eq!(texts, ["1", "2", "3", "0"]);
}

#[test]
fn trailing_delimiter_is_accepted() {
    let file = file_of(
        "
        macro total { ($($x:expr),+) : ($($x +)* 0) }
        var t = total!(4, 5,)
        ",
    );
    assert!(matches!(initializer_of(&file), Expr::Binary { .. }));
}

#[test]
fn first_matching_pattern_wins() {
    let file = file_of(
        "
        macro pick {
            (one) : (1)
            (two) : (2)
        }
        var a = pick!(two)
        ",
    );
    assert!(matches!(initializer_of(&file), Expr::Value(t) if t.text == "2"));
}

#[test]
fn bare_call_matches_an_empty_pattern() {
    let file = file_of(
        "
        macro unit { () : (0) }
        var z = unit!
        ",
    );
    assert!(matches!(initializer_of(&file), Expr::Value(t) if t.text == "0"));
}

#[test]
fn expanded_tokens_point_at_the_call_site() {
    let source = "macro pick { (one) : (1) }\nvar a = pick!(one)";
    let file = file_of(source);
    let Expr::Value(token) = initializer_of(&file) else {
        panic!("expected a value");
    };
    let call_offset = source.find("pick!").unwrap();
    assert_eq!(token.span.start.offset, call_offset);
    assert_eq!(token.span.end.offset, source.len());
}

#[test]
fn token_captures_splice_raw_tokens() {
    let tokens = expand_source(
        "macro twice { ($x:token) : ($x $x) } twice!(go)",
        "test.tk",
    )
    .unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["go", "go"]);
}

#[test]
fn nested_calls_expand_outside_in() {
    let file = file_of(
        "
        macro double { ($x:expr) : ($x + $x) }
        macro quad { ($x:expr) : (double!(double!($x))) }
        var q = quad!(3)
        ",
    );
    // quad!(3) = double!(double!(3)) = (3 + 3) + (3 + 3)
    let Expr::Binary { left, right, .. } = initializer_of(&file) else {
        panic!("expected a binary expression");
    };
    assert!(matches!(**left, Expr::Binary { .. }));
    assert!(matches!(**right, Expr::Binary { .. }));
}

#[test]
fn unknown_macro_is_an_error() {
    let message = first_message("var x = nope!(1)");
    assert!(message.contains("no macro with name"), "got: {message}");
}

#[test]
fn non_matching_arguments_are_an_error() {
    let message = first_message(
        "macro pair { ($a:expr, $b:expr) : ($a + $b) }\nvar x = pair!(1)",
    );
    assert!(message.contains("do not match any pattern"), "got: {message}");
}

#[test]
fn missing_delimiter_between_loops_is_an_error() {
    let message = first_message(
        "macro list { ($($x:expr),+) : ($($x)*) }\nvar x = list!(1 2)",
    );
    assert!(message.contains("do not match any pattern"), "got: {message}");
}

#[test]
fn runaway_recursive_macro_hits_the_expansion_limit() {
    let message = first_message("macro loopy { () : (loopy!) }\nvar x = loopy!");
    assert!(message.contains("expansion limit"), "got: {message}");
}

#[test]
fn template_capture_without_a_matched_value_is_an_error() {
    let message = first_message(
        "macro broken { ($(a)* $x:expr) : ($x $y) }\nvar v = broken!(1)",
    );
    assert!(!message.is_empty());
}
