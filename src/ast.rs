//! The syntax tree.
//!
//! Nodes keep the tokens they were built from, so spans, verbatim text, and
//! decoded literal values stay available to later passes. Everything derives
//! `Serialize` for the CLI's JSON dump.

use serde::Serialize;

use crate::scanner::Token;
use crate::span::Span;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct File {
    pub body: Vec<Node>,
}

/// Anything that can appear in a file body or a block body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Function(FunctionDeclaration),
    Macro(MacroDef),
    Stmt(Stmt),
    Expr(Expr),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Function(f) => f.span,
            Node::Macro(m) => m.span,
            Node::Stmt(s) => s.span(),
            Node::Expr(e) => e.span(),
        }
    }
}

// ============================================================================
// SECTION: declarations and statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: Option<Token>,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: Token,
    pub ty: Option<Token>,
    pub default_value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Var(VariableDeclaration),
    /// A `var (a = 1, b = 2)` group.
    MultiVar {
        declarations: Vec<VariableDeclaration>,
        span: Span,
    },
    If(Box<IfStatement>),
    For(Box<ForLoop>),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(v) => v.span,
            Stmt::MultiVar { span, .. } => *span,
            Stmt::If(i) => i.span,
            Stmt::For(f) => f.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub name: Token,
    pub ty: Option<Token>,
    pub value: Option<Expr>,
    pub constant: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub init: Option<Box<Node>>,
    pub condition: Option<Expr>,
    pub after: Option<Box<Node>>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub body: Vec<Node>,
    pub span: Span,
}

// ============================================================================
// SECTION: expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// An identifier or literal.
    Value(Token),
    Unary {
        operator: Token,
        operand: Box<Expr>,
        prefix: bool,
    },
    Binary {
        operator: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        operator: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<CallArgument>,
        span: Span,
    },
    Member {
        target: Box<Expr>,
        property: Token,
    },
    Function(Box<FunctionDeclaration>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Value(token) => token.span,
            Expr::Unary {
                operator,
                operand,
                prefix,
            } => {
                if *prefix {
                    Span::between(operator.span, operand.span())
                } else {
                    Span::between(operand.span(), operator.span)
                }
            }
            Expr::Binary { left, right, .. } | Expr::Comparison { left, right, .. } => {
                Span::between(left.span(), right.span())
            }
            Expr::Assign { target, value } => Span::between(target.span(), value.span()),
            Expr::Call { span, .. } => *span,
            Expr::Member { target, property } => Span::between(target.span(), property.span),
            Expr::Function(f) => f.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallArgument {
    pub name: Option<Token>,
    pub value: Expr,
}

// ============================================================================
// SECTION: macro definitions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroDef {
    pub name: Token,
    pub patterns: Vec<MacroPattern>,
    pub span: Span,
}

/// One `(pattern) : (template)` arm of a macro definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroPattern {
    pub matches: Vec<MacroMatch>,
    pub template: Vec<TemplatePiece>,
}

/// One element of a macro pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MacroMatch {
    /// A token the call must contain verbatim.
    Literal(Token),
    /// `$name:kind`, binding one parsed value.
    Capture {
        name: String,
        kind: CaptureKind,
        span: Span,
    },
    /// `$( ... )` with a repetition operand and optional delimiter.
    Repetition(MacroRepetition),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroRepetition {
    pub pattern: Vec<MacroMatch>,
    pub operand: RepetitionOperand,
    pub delimiter: Option<Token>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepetitionOperand {
    /// `+`
    OneOrMore,
    /// `*`
    ZeroOrMore,
    /// `?`
    ZeroOrOne,
}

/// What a capture is allowed to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CaptureKind {
    Token,
    Expr,
    Stmt,
    Block,
}

impl CaptureKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "token" => Some(CaptureKind::Token),
            "expr" => Some(CaptureKind::Expr),
            "stmt" => Some(CaptureKind::Stmt),
            "block" => Some(CaptureKind::Block),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CaptureKind::Token => "token",
            CaptureKind::Expr => "expr",
            CaptureKind::Stmt => "stmt",
            CaptureKind::Block => "block",
        }
    }
}

/// A run of template tokens, or a nested `$( ... )` template group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TemplatePiece {
    Literal(Vec<Token>),
    Repetition(Vec<TemplatePiece>),
}

/// A value bound by a capture during macro matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MacroValue {
    Token(Token),
    Expr(Expr),
    Stmt(Stmt),
    Block(Block),
}

impl MacroValue {
    pub fn kind(&self) -> CaptureKind {
        match self {
            MacroValue::Token(_) => CaptureKind::Token,
            MacroValue::Expr(_) => CaptureKind::Expr,
            MacroValue::Stmt(_) => CaptureKind::Stmt,
            MacroValue::Block(_) => CaptureKind::Block,
        }
    }
}

/// Words reserved by the grammar; identifiers may not shadow them.
pub fn is_keyword(word: &str) -> bool {
    use once_cell::sync::Lazy;
    use std::collections::HashSet;

    static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
        ["fn", "return", "if", "else", "for", "var", "const", "extern", "macro"]
            .into_iter()
            .collect()
    });
    KEYWORDS.contains(word)
}
