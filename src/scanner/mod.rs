//! The lexer.
//!
//! [`Scanner`] turns source text into [`Token`]s one call at a time. It emits
//! whitespace and comment tokens rather than skipping them (the parser filters
//! them out), reports lexical problems through an error callback instead of
//! failing, and keeps scanning so a single bad character does not hide later
//! errors.

mod token;

pub use token::{Token, TokenKind, TokenValue};

use crate::span::{Position, Span};

/// Callback invoked for every lexical error.
pub type ErrorHandler = Box<dyn FnMut(Span, String)>;

pub struct Scanner<'src> {
    rest: &'src str,
    pos: Position,
    error: Option<ErrorHandler>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            rest: source,
            pos: Position::start(),
            error: None,
        }
    }

    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error = Some(handler);
    }

    /// The next token. Returns an EOF token forever once the input ends.
    pub fn scan(&mut self) -> Token {
        let start = self.pos;
        let Some(ch) = self.peek_char() else {
            return Token::eof(Span::new(start, start));
        };

        match ch {
            c if c.is_whitespace() => self.scan_whitespace(start),
            c if is_ident_start(c) => self.scan_ident(start),
            '$' => self.scan_dollar(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            '/' => self.scan_slash(start),
            '"' | '\'' => self.scan_string(start),
            '.' => self.scan_period(start),
            _ => self.scan_operator(start, ch),
        }
    }

    // ------------------------------------------------------------------
    // token scanners
    // ------------------------------------------------------------------

    fn scan_whitespace(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            text.push(c);
            self.bump();
        }
        self.token(TokenKind::Whitespace, text, start)
    }

    fn scan_ident(&mut self, start: Position) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if !is_ident_continue(c) {
                break;
            }
            name.push(c);
            self.bump();
        }

        match name.as_str() {
            "true" | "false" => {
                let value = TokenValue::Bool(name == "true");
                return self.token(TokenKind::Boolean, name, start).with_value(value);
            }
            _ => {}
        }

        // `name!` is a macro call, unless the `!` starts a `!=`.
        if self.peek_char() == Some('!') && self.peek_second() != Some('=') {
            self.bump();
            let text = format!("{name}!");
            return self
                .token(TokenKind::MacroCallIdent, text, start)
                .with_value(TokenValue::Str(name));
        }

        self.token(TokenKind::Ident, name, start)
    }

    fn scan_dollar(&mut self, start: Position) -> Token {
        self.bump();
        if self.peek_char().map_or(false, is_ident_start) {
            let mut text = String::from("$");
            while let Some(c) = self.peek_char() {
                if !is_ident_continue(c) {
                    break;
                }
                text.push(c);
                self.bump();
            }
            return self.token(TokenKind::MacroIdent, text, start);
        }
        self.token(TokenKind::Dollar, "$", start)
    }

    fn scan_number(&mut self, start: Position) -> Token {
        let mut text = String::new();
        let mut kind = TokenKind::Integer;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && kind == TokenKind::Integer && self.second_is_digit() {
                kind = TokenKind::Float;
                text.push(c);
            } else {
                break;
            }
            self.bump();
        }

        let end = self.pos;
        let value = if kind == TokenKind::Integer {
            match text.parse::<i64>() {
                Ok(n) => Some(TokenValue::Int(n)),
                Err(err) => {
                    self.report(Span::new(start, end), format!("invalid integer literal: {err}"));
                    None
                }
            }
        } else {
            match text.parse::<f64>() {
                Ok(n) => Some(TokenValue::Float(n)),
                Err(err) => {
                    self.report(Span::new(start, end), format!("invalid float literal: {err}"));
                    None
                }
            }
        };

        let mut token = self.token(kind, text, start);
        token.value = value;
        token
    }

    fn scan_slash(&mut self, start: Position) -> Token {
        self.bump();
        match self.peek_char() {
            Some('/') => {
                let mut text = String::from("/");
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                self.token(TokenKind::Comment, text, start)
            }
            Some('*') => {
                let mut text = String::from("/");
                let mut closed = false;
                while let Some(c) = self.peek_char() {
                    text.push(c);
                    self.bump();
                    if c == '*' && self.peek_char() == Some('/') {
                        text.push('/');
                        self.bump();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    let span = Span::new(start, self.pos);
                    self.report(span, "unterminated block comment".to_string());
                    return self.token(TokenKind::Unknown, text, start);
                }
                self.token(TokenKind::Comment, text, start)
            }
            _ => self.token(TokenKind::Slash, "/", start),
        }
    }

    fn scan_string(&mut self, start: Position) -> Token {
        let quote = match self.bump() {
            Some(q) => q,
            None => return Token::eof(Span::new(start, start)),
        };
        let mut text = String::from(quote);
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => {
                    let span = Span::new(start, self.pos);
                    self.report(span, "end of file before string closed".to_string());
                    return self.token(TokenKind::Unknown, text, start);
                }
                Some('\n') => {
                    let span = Span::new(start, self.pos);
                    self.report(
                        span,
                        "line breaks are not allowed in string literals".to_string(),
                    );
                    return self.token(TokenKind::Unknown, text, start);
                }
                Some('\\') => {
                    text.push('\\');
                    self.bump();
                    self.scan_escape(quote, &mut text, &mut value);
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
        }

        self.token(TokenKind::String, text, start)
            .with_value(TokenValue::Str(value))
    }

    fn scan_escape(&mut self, quote: char, text: &mut String, value: &mut String) {
        let Some(c) = self.peek_char() else {
            return;
        };
        match c {
            q if q == quote => {
                value.push(q);
                text.push(q);
                self.bump();
            }
            '\\' => {
                value.push('\\');
                text.push('\\');
                self.bump();
            }
            'n' | 't' | 'r' => {
                value.push(match c {
                    'n' => '\n',
                    't' => '\t',
                    _ => '\r',
                });
                text.push(c);
                self.bump();
            }
            '0'..='7' => {
                // Up to three octal digits.
                self.scan_digits(8, 3, text, value);
            }
            'x' => {
                text.push(c);
                self.bump();
                self.scan_digits(16, 2, text, value);
            }
            'u' => {
                text.push(c);
                self.bump();
                self.scan_digits(16, 4, text, value);
            }
            'U' => {
                text.push(c);
                self.bump();
                self.scan_digits(16, 8, text, value);
            }
            other => {
                // Unrecognized escapes pass through verbatim.
                value.push('\\');
                value.push(other);
                text.push(other);
                self.bump();
            }
        }
    }

    fn scan_digits(&mut self, base: u32, count: usize, text: &mut String, value: &mut String) {
        let start = self.pos;
        let mut result: u32 = 0;
        let mut remaining = count;
        while remaining > 0 {
            let Some(c) = self.peek_char() else { break };
            let Some(digit) = c.to_digit(base) else { break };
            text.push(c);
            self.bump();
            result = result.wrapping_mul(base).wrapping_add(digit);
            remaining -= 1;
        }

        if remaining > 0 {
            let span = Span::new(start, self.pos);
            self.report(span, "illegal character escape".to_string());
            return;
        }
        match char::from_u32(result) {
            Some(decoded) => value.push(decoded),
            None => {
                let span = Span::new(start, self.pos);
                self.report(span, "escape is not a valid character".to_string());
            }
        }
    }

    fn scan_period(&mut self, start: Position) -> Token {
        if self.second_is_digit() {
            // `.5` is a float literal.
            let mut text = String::from(".");
            self.bump();
            while let Some(c) = self.peek_char() {
                if !c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                self.bump();
            }
            let value = text.parse::<f64>().ok().map(TokenValue::Float);
            let mut token = self.token(TokenKind::Float, text, start);
            token.value = value;
            return token;
        }

        self.bump();
        if self.peek_char() == Some('.') {
            self.bump();
            if self.peek_char() == Some('.') {
                self.bump();
                return self.token(TokenKind::Ellipsis, "...", start);
            }
            let span = Span::new(start, self.pos);
            self.report(span, "unexpected token `..`".to_string());
            return self.token(TokenKind::Unknown, "..", start);
        }
        self.token(TokenKind::Period, ".", start)
    }

    fn scan_operator(&mut self, start: Position, ch: char) -> Token {
        self.bump();
        let (kind, text): (TokenKind, &str) = match ch {
            ',' => (TokenKind::Comma, ","),
            ':' => (TokenKind::Colon, ":"),
            ';' => (TokenKind::Semicolon, ";"),
            '\\' => (TokenKind::Backslash, "\\"),
            '*' => (TokenKind::Asterisk, "*"),
            '&' => (TokenKind::Ampersand, "&"),
            '#' => (TokenKind::Hash, "#"),
            '?' => (TokenKind::Question, "?"),
            '(' => (TokenKind::LParen, "("),
            ')' => (TokenKind::RParen, ")"),
            '[' => (TokenKind::LBracket, "["),
            ']' => (TokenKind::RBracket, "]"),
            '{' => (TokenKind::LBrace, "{"),
            '}' => (TokenKind::RBrace, "}"),
            '+' => {
                if self.eat_char('+') {
                    (TokenKind::Increment, "++")
                } else {
                    (TokenKind::Add, "+")
                }
            }
            '-' => {
                if self.eat_char('-') {
                    (TokenKind::Decrement, "--")
                } else {
                    (TokenKind::Sub, "-")
                }
            }
            '<' => {
                if self.eat_char('=') {
                    (TokenKind::LessOrEqual, "<=")
                } else {
                    (TokenKind::Less, "<")
                }
            }
            '>' => {
                if self.eat_char('=') {
                    (TokenKind::GreaterOrEqual, ">=")
                } else {
                    (TokenKind::Greater, ">")
                }
            }
            '!' => {
                if self.eat_char('=') {
                    (TokenKind::NotEqual, "!=")
                } else {
                    (TokenKind::Excl, "!")
                }
            }
            '=' => {
                if self.eat_char('=') {
                    (TokenKind::Equal, "==")
                } else {
                    (TokenKind::Assign, "=")
                }
            }
            other => {
                let span = Span::new(start, self.pos);
                self.report(span, format!("unexpected character `{other}`"));
                return self.token(TokenKind::Unknown, other.to_string(), start);
            }
        };
        self.token(kind, text, start)
    }

    // ------------------------------------------------------------------
    // input plumbing
    // ------------------------------------------------------------------

    fn token(&self, kind: TokenKind, text: impl Into<String>, start: Position) -> Token {
        Token::new(kind, text, Span::new(start, self.pos))
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest.chars();
        chars.next();
        chars.next()
    }

    fn second_is_digit(&self) -> bool {
        self.peek_second().map_or(false, |c| c.is_ascii_digit())
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.rest = &self.rest[ch.len_utf8()..];
        self.pos.offset += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn report(&mut self, span: Span, message: String) {
        if let Some(handler) = &mut self.error {
            handler(span, message);
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn kinds_of(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        loop {
            let token = scanner.scan();
            let kind = token.kind;
            if kind != TokenKind::Whitespace {
                out.push(kind);
            }
            if kind == TokenKind::Eof {
                break;
            }
        }
        out
    }

    fn single(source: &str) -> Token {
        let mut scanner = Scanner::new(source);
        scanner.scan()
    }

    #[test]
    fn scans_identifiers_and_literals() {
        assert_eq!(
            kinds_of("foo 12 3.5 \"hi\" true"),
            vec![
                TokenKind::Ident,
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::String,
                TokenKind::Boolean,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_and_float_values_are_decoded() {
        assert_eq!(single("42").int_value(), Some(42));
        assert_eq!(single("2.5").float_value(), Some(2.5));
        assert_eq!(single(".5").float_value(), Some(0.5));
    }

    #[test]
    fn macro_call_ident_keeps_name_in_value() {
        let token = single("greet!(");
        assert_eq!(token.kind, TokenKind::MacroCallIdent);
        assert_eq!(token.text, "greet!");
        assert_eq!(token.str_value(), Some("greet"));
    }

    #[test]
    fn bang_equals_is_not_a_macro_call() {
        assert_eq!(
            kinds_of("a != b"),
            vec![
                TokenKind::Ident,
                TokenKind::NotEqual,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dollar_ident_is_a_metavariable() {
        let token = single("$foo");
        assert_eq!(token.kind, TokenKind::MacroIdent);
        assert_eq!(token.text, "$foo");

        // A bare dollar stays its own token so `$(` opens a repetition.
        assert_eq!(
            kinds_of("$("),
            vec![TokenKind::Dollar, TokenKind::LParen, TokenKind::Eof]
        );
    }

    #[test]
    fn comments_become_tokens() {
        assert_eq!(
            kinds_of("1 // line\n2 /* block */ 3"),
            vec![
                TokenKind::Integer,
                TokenKind::Comment,
                TokenKind::Integer,
                TokenKind::Comment,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        let token = single(r#""a\n\"b\x41""#);
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.str_value(), Some("a\n\"bA"));
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds_of("== != <= >= ++ -- ..."),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessOrEqual,
                TokenKind::GreaterOrEqual,
                TokenKind::Increment,
                TokenKind::Decrement,
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_error() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let mut scanner = Scanner::new("\"oops");
        scanner.set_error_handler(Box::new(move |_, message| {
            sink.borrow_mut().push(message);
        }));
        let token = scanner.scan();
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("string"));
    }

    #[test]
    fn spans_track_lines_and_offsets() {
        let mut scanner = Scanner::new("ab\ncd");
        let first = scanner.scan();
        assert_eq!(first.span.start.line, 1);
        assert_eq!(first.span.start.offset, 0);
        scanner.scan(); // newline
        let second = scanner.scan();
        assert_eq!(second.span.start.line, 2);
        assert_eq!(second.span.start.column, 1);
        assert_eq!(second.span.start.offset, 3);
    }
}
