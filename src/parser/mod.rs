//! The recursive-descent parser.
//!
//! The parser pulls tokens from the scanner through a backtracking buffer:
//! grammar rules `read` and `unread` one token at a time, and multi-token
//! speculation brackets itself with `snapshot` / `restore` / `commit`
//! checkpoints. Macro expansion hooks into `read` itself: a macro-call token is
//! resolved against the definition table, its arguments are consumed, and the
//! expanded tokens are pushed to the front of the buffer so the grammar never
//! sees the call.

mod declaration;
mod expander;
mod expression;
mod macro_matcher;
mod macro_processor;
mod macros;
mod statement;

pub(crate) use macro_matcher::MacroMatcher;
pub(crate) use macro_processor::MacroProcessor;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::ast::{File, MacroDef, Node};
use crate::diagnostics::{
    DiagnosticKind, DiagnosticSink, ParseDiagnostic, SharedSink, TankaError,
};
use crate::scanner::{Scanner, Token, TokenKind};
use crate::span::Span;

pub struct Parser<'src> {
    scanner: Scanner<'src>,
    source: &'src str,
    /// Tokens pushed back for re-reading, including macro expansion output.
    buffer: VecDeque<Token>,
    /// The token most recently handed out, for `unread`.
    last: Option<Token>,
    /// Active checkpoints; each records the tokens read since it opened.
    checkpoints: Vec<Vec<Token>>,
    /// How many tokens the scanner has produced, shared with its error hook.
    scanned: Rc<Cell<usize>>,
    sink: SharedSink,
    macros: HashMap<String, Rc<MacroDef>>,
    /// Nesting depth of in-flight macro expansions.
    expansion_depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let sink: SharedSink = Rc::new(RefCell::new(DiagnosticSink::default()));
        let scanned = Rc::new(Cell::new(0usize));

        let mut scanner = Scanner::new(source);
        let lex_sink = sink.clone();
        let lex_count = scanned.clone();
        scanner.set_error_handler(Box::new(move |span, message| {
            lex_sink.borrow_mut().report(ParseDiagnostic {
                kind: DiagnosticKind::Lex,
                token_index: lex_count.get(),
                span,
                message,
            });
        }));

        Parser {
            scanner,
            source,
            buffer: VecDeque::new(),
            last: None,
            checkpoints: Vec::new(),
            scanned,
            sink,
            macros: HashMap::new(),
            expansion_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // driving
    // ------------------------------------------------------------------

    /// Parse a whole file, failing on the first recorded diagnostic.
    pub fn parse_file(self, source_name: &str) -> Result<File, TankaError> {
        let source = self.source;
        let (file, diagnostics) = self.parse_with_diagnostics();
        match diagnostics.first() {
            Some(first) => Err(TankaError::from_diagnostic(first, source_name, source)),
            None => Ok(file),
        }
    }

    /// Parse a whole file, returning whatever was built together with every
    /// diagnostic that was reported along the way.
    pub fn parse_with_diagnostics(mut self) -> (File, Vec<ParseDiagnostic>) {
        let mut file = File::default();
        loop {
            if self.has_error() {
                break;
            }
            if let Some(def) = self.parse_macro_definition() {
                self.register_macro(&def);
                file.body.push(Node::Macro(def));
                continue;
            }
            if let Some(function) = self.parse_function_declaration() {
                file.body.push(Node::Function(function));
                continue;
            }
            if let Some(decl) = self.parse_variable_declaration() {
                file.body.push(Node::Stmt(decl));
                continue;
            }
            if self.has_error() {
                break;
            }
            let token = self.read();
            if token.kind == TokenKind::Eof {
                break;
            }
            self.error(
                DiagnosticKind::Parse,
                token.span,
                format!("unexpected {}", token.describe()),
            );
            break;
        }
        let diagnostics = self.sink.borrow().entries().to_vec();
        (file, diagnostics)
    }

    fn register_macro(&mut self, def: &MacroDef) {
        let name = def.name.text.clone();
        if self.macros.contains_key(&name) {
            self.error(
                DiagnosticKind::MacroDefinition,
                def.name.span,
                format!("macro `{name}` is already defined"),
            );
            return;
        }
        self.macros.insert(name, Rc::new(def.clone()));
    }

    // ------------------------------------------------------------------
    // token buffer
    // ------------------------------------------------------------------

    /// The next token, with macro calls expanded in place.
    pub(crate) fn read(&mut self) -> Token {
        self.read_token(true)
    }

    /// The next token; `expand` controls whether macro-call tokens are
    /// resolved or handed out verbatim.
    pub(crate) fn read_token(&mut self, expand: bool) -> Token {
        let mut expansions = 0usize;
        loop {
            let token = self.read_raw();
            if expand && token.kind == TokenKind::MacroCallIdent {
                if expansions >= macros::MACRO_EXPANSION_LIMIT {
                    self.error(
                        DiagnosticKind::MacroExpansion,
                        token.span,
                        "macro expansion limit reached",
                    );
                    return token;
                }
                if self.expand_macro_call(&token) {
                    expansions += 1;
                    continue;
                }
            }
            return token;
        }
    }

    fn read_raw(&mut self) -> Token {
        let token = match self.buffer.pop_front() {
            Some(token) => token,
            None => loop {
                let token = self.scanner.scan();
                if matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment) {
                    continue;
                }
                self.scanned.set(self.scanned.get() + 1);
                break token;
            },
        };
        self.last = Some(token.clone());
        if let Some(checkpoint) = self.checkpoints.last_mut() {
            checkpoint.push(token.clone());
        }
        token
    }

    /// Push the most recently read token back.
    pub(crate) fn unread(&mut self) {
        if let Some(token) = self.last.take() {
            if let Some(checkpoint) = self.checkpoints.last_mut() {
                checkpoint.pop();
            }
            self.buffer.push_front(token);
        }
    }

    /// Look at the next token without consuming it. Does not expand macros.
    pub(crate) fn peek(&mut self) -> Token {
        let token = self.read_raw();
        if let Some(checkpoint) = self.checkpoints.last_mut() {
            checkpoint.pop();
        }
        self.buffer.push_front(token.clone());
        self.last = None;
        token
    }

    /// Open a checkpoint; every token read from here on is recorded.
    pub(crate) fn snapshot(&mut self) {
        self.checkpoints.push(Vec::new());
    }

    /// Abandon the current checkpoint and replay its tokens.
    pub(crate) fn restore(&mut self) {
        if let Some(tokens) = self.checkpoints.pop() {
            for token in tokens.into_iter().rev() {
                self.buffer.push_front(token);
            }
            self.last = None;
        }
    }

    /// Close the current checkpoint, keeping its reads consumed. The record
    /// merges into the enclosing checkpoint so an outer `restore` still
    /// replays everything.
    pub(crate) fn commit(&mut self) {
        if let Some(tokens) = self.checkpoints.pop() {
            if let Some(parent) = self.checkpoints.last_mut() {
                parent.extend(tokens);
            }
        }
    }

    /// Push already-read tokens back to the front of the buffer, first token
    /// first out. Used by macro expansion to splice its output in.
    pub(crate) fn return_to_buffer(&mut self, tokens: Vec<Token>) {
        for token in tokens.into_iter().rev() {
            self.buffer.push_front(token);
        }
        self.last = None;
    }

    // ------------------------------------------------------------------
    // expectation helpers
    // ------------------------------------------------------------------

    /// Consume the next token if it has the given kind; otherwise unread it.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.read();
        if token.kind == kind {
            Some(token)
        } else {
            self.unread();
            None
        }
    }

    pub(crate) fn eat_any(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        let token = self.read();
        if kinds.contains(&token.kind) {
            Some(token)
        } else {
            self.unread();
            None
        }
    }

    pub(crate) fn eat_keyword(&mut self, word: &str) -> Option<Token> {
        let token = self.read();
        if token.kind == TokenKind::Ident && token.text == word {
            Some(token)
        } else {
            self.unread();
            None
        }
    }

    /// Consume the next token, which must have the given kind; report a parse
    /// error otherwise.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        self.expect_in(kind, DiagnosticKind::Parse)
    }

    pub(crate) fn expect_in(&mut self, kind: TokenKind, category: DiagnosticKind) -> Option<Token> {
        let token = self.read();
        if token.kind == kind {
            Some(token)
        } else {
            self.error(
                category,
                token.span,
                format!(
                    "expected {}, found {}",
                    describe_kind(kind),
                    token.describe()
                ),
            );
            None
        }
    }

    // ------------------------------------------------------------------
    // diagnostics
    // ------------------------------------------------------------------

    pub(crate) fn error(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        let token_index = self.scanned.get().saturating_sub(self.buffer.len());
        self.sink.borrow_mut().report(ParseDiagnostic {
            kind,
            token_index,
            span,
            message: message.into(),
        });
    }

    pub(crate) fn has_error(&self) -> bool {
        !self.sink.borrow().is_empty()
    }

    fn first_error(&self, source_name: &str) -> Option<TankaError> {
        self.sink
            .borrow()
            .entries()
            .first()
            .map(|d| TankaError::from_diagnostic(d, source_name, self.source))
    }
}

/// The token stream of a source file after macro definitions are stripped and
/// every macro call is expanded.
pub fn expand_source(source: &str, source_name: &str) -> Result<Vec<Token>, TankaError> {
    let mut parser = Parser::new(source);
    let mut tokens = Vec::new();
    loop {
        if parser.has_error() {
            break;
        }
        if let Some(def) = parser.parse_macro_definition() {
            parser.register_macro(&def);
            continue;
        }
        let token = parser.read();
        if token.kind == TokenKind::Eof {
            break;
        }
        tokens.push(token);
    }
    match parser.first_error(source_name) {
        Some(error) => Err(error),
        None => Ok(tokens),
    }
}

fn describe_kind(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::LParen => "`(`",
        TokenKind::RParen => "`)`",
        TokenKind::LBracket => "`[`",
        TokenKind::RBracket => "`]`",
        TokenKind::LBrace => "`{`",
        TokenKind::RBrace => "`}`",
        TokenKind::Colon => "`:`",
        TokenKind::Semicolon => "`;`",
        TokenKind::Comma => "`,`",
        TokenKind::Assign => "`=`",
        TokenKind::Ident => "an identifier",
        TokenKind::Eof => "end of file",
        _ => "a different token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(source: &str) -> Parser<'_> {
        Parser::new(source)
    }

    #[test]
    fn read_and_unread_round_trip() {
        let mut p = parser("a b c");
        let a = p.read();
        assert_eq!(a.text, "a");
        p.unread();
        assert_eq!(p.read().text, "a");
        assert_eq!(p.read().text, "b");
    }

    #[test]
    fn peek_does_not_consume() {
        let mut p = parser("a b");
        assert_eq!(p.peek().text, "a");
        assert_eq!(p.read().text, "a");
        assert_eq!(p.read().text, "b");
    }

    #[test]
    fn restore_replays_reads_since_snapshot() {
        let mut p = parser("a b c");
        p.snapshot();
        p.read();
        p.read();
        p.restore();
        assert_eq!(p.read().text, "a");
        assert_eq!(p.read().text, "b");
        assert_eq!(p.read().text, "c");
    }

    #[test]
    fn committed_inner_checkpoint_still_restores_with_outer() {
        let mut p = parser("a b c d");
        p.snapshot();
        p.read(); // a
        p.snapshot();
        p.read(); // b
        p.read(); // c
        p.commit();
        p.read(); // d
        p.restore();
        let replayed: Vec<String> = (0..4).map(|_| p.read().text).collect();
        assert_eq!(replayed, ["a", "b", "c", "d"]);
    }

    #[test]
    fn unread_inside_checkpoint_is_not_recorded_twice() {
        let mut p = parser("a b");
        p.snapshot();
        p.read();
        p.unread();
        p.read();
        p.restore();
        assert_eq!(p.read().text, "a");
        assert_eq!(p.read().text, "b");
    }

    #[test]
    fn eof_is_sticky() {
        let mut p = parser("");
        assert_eq!(p.read().kind, TokenKind::Eof);
        assert_eq!(p.read().kind, TokenKind::Eof);
    }
}
