//! Token model shared by the scanner, parser, and macro engine.

use serde::Serialize;

use crate::ast::MacroValue;
use crate::span::Span;

/// Every token kind the scanner can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Unknown,
    Eof,
    Ident,
    /// `$name`, a macro metavariable.
    MacroIdent,
    /// `name!`, a macro invocation.
    MacroCallIdent,
    Whitespace,
    Comment,
    String,
    Integer,
    Float,
    Boolean,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Less,
    Greater,
    Comma,
    Period,
    Colon,
    Semicolon,
    Assign,
    Add,
    Sub,
    Asterisk,
    Slash,
    Backslash,
    Ampersand,
    Dollar,
    Hash,
    Excl,
    Question,
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
    Increment,
    Decrement,
    Ellipsis,
}

impl TokenKind {
    /// The closing counterpart of an opening delimiter.
    pub fn closing(self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            TokenKind::LBrace => Some(TokenKind::RBrace),
            _ => None,
        }
    }

    pub fn is_opening_delimiter(self) -> bool {
        self.closing().is_some()
    }
}

/// The decoded value of a literal token, or the parsed node a macro expansion
/// spliced back into the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// A capture carried through expansion as an already-parsed node.
    Node(Box<MacroValue>),
}

/// One lexical token: kind, verbatim text, decoded value, and source span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: Option<TokenValue>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            value: None,
            span,
        }
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn eof(span: Span) -> Self {
        Token::new(TokenKind::Eof, "", span)
    }

    /// Textual identity used by macro literal matching and delimiter checks.
    pub fn same_literal(&self, other: &Token) -> bool {
        self.kind == other.kind && self.text == other.text
    }

    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::String => format!("string {:?}", self.text),
            _ => format!("`{}`", self.text),
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.value {
            Some(TokenValue::Int(n)) => Some(n),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.value {
            Some(TokenValue::Float(n)) => Some(n),
            _ => None,
        }
    }

    pub fn str_value(&self) -> Option<&str> {
        match &self.value {
            Some(TokenValue::Str(s)) => Some(s),
            _ => None,
        }
    }
}
