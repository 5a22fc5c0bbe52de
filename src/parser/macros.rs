//! Macro definitions and calls.
//!
//! `macro name { (pattern) : (template) ... }` declares patterns; a call
//! `name!( ... )` collects the tokens between its delimiters, feeds them to a
//! [`MacroMatcher`](super::MacroMatcher) over the definition's patterns, and
//! splices the expanded template back into the token stream. While collecting,
//! the driver asks the matcher which capture kinds are acceptable and tries to
//! parse a block, then an expression, then a statement before falling back to
//! one raw token.

use crate::ast::{
    is_keyword, CaptureKind, MacroDef, MacroMatch, MacroPattern, MacroRepetition, MacroValue,
    RepetitionOperand, TemplatePiece,
};
use crate::diagnostics::DiagnosticKind;
use crate::scanner::{Token, TokenKind};
use crate::span::Span;

use super::{expander, MacroMatcher, Parser};

/// Cap on rescanned and nested expansions, against runaway recursive macros.
pub(crate) const MACRO_EXPANSION_LIMIT: usize = 128;

const OPENING_DELIMITERS: [TokenKind; 3] =
    [TokenKind::LParen, TokenKind::LBrace, TokenKind::LBracket];

impl Parser<'_> {
    // ------------------------------------------------------------------
    // definitions
    // ------------------------------------------------------------------

    pub(crate) fn parse_macro_definition(&mut self) -> Option<MacroDef> {
        let keyword = self.eat_keyword("macro")?;
        let name = self.expect_in(TokenKind::Ident, DiagnosticKind::MacroDefinition)?;
        if is_keyword(&name.text) {
            self.error(
                DiagnosticKind::MacroDefinition,
                name.span,
                format!("`{}` is a reserved keyword", name.text),
            );
            return None;
        }
        self.expect_in(TokenKind::LBrace, DiagnosticKind::MacroDefinition)?;

        let mut patterns = Vec::new();
        loop {
            match self.parse_macro_pattern() {
                Some(pattern) => patterns.push(pattern),
                None => {
                    if self.has_error() {
                        return None;
                    }
                    break;
                }
            }
        }

        let close = self.expect_in(TokenKind::RBrace, DiagnosticKind::MacroDefinition)?;
        Some(MacroDef {
            name,
            patterns,
            span: Span::between(keyword.span, close.span),
        })
    }

    fn parse_macro_pattern(&mut self) -> Option<MacroPattern> {
        let matches = self.parse_macro_match_sequence()?;
        self.expect_in(TokenKind::Colon, DiagnosticKind::MacroDefinition)?;
        let Some(template) = self.parse_macro_template() else {
            if !self.has_error() {
                let token = self.read();
                self.error(
                    DiagnosticKind::MacroDefinition,
                    token.span,
                    format!("expected macro template, found {}", token.describe()),
                );
            }
            return None;
        };
        Some(MacroPattern { matches, template })
    }

    /// A delimited pattern sequence: literals, captures, and repetitions up
    /// to the matching closing delimiter.
    fn parse_macro_match_sequence(&mut self) -> Option<Vec<MacroMatch>> {
        let open = self.eat_any(&OPENING_DELIMITERS)?;
        let Some(close) = open.kind.closing() else {
            return None;
        };

        let mut depth = 1usize;
        let mut matches = Vec::new();
        loop {
            if self.peek().kind == TokenKind::Dollar {
                let repetition = self.parse_macro_repetition()?;
                matches.push(repetition);
                continue;
            }
            if let Some(capture) = self.parse_macro_capture() {
                matches.push(capture);
                continue;
            }
            if self.has_error() {
                return None;
            }

            let token = self.read();
            match token.kind {
                kind if kind == open.kind => {
                    depth += 1;
                    matches.push(MacroMatch::Literal(token));
                }
                kind if kind == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.unread();
                        break;
                    }
                    matches.push(MacroMatch::Literal(token));
                }
                TokenKind::Eof => {
                    self.error(
                        DiagnosticKind::MacroDefinition,
                        token.span,
                        "unexpected end of file in macro pattern",
                    );
                    return None;
                }
                _ => matches.push(MacroMatch::Literal(token)),
            }
        }

        self.expect_in(close, DiagnosticKind::MacroDefinition)?;
        Some(matches)
    }

    /// `$( ... )` followed by an optional delimiter token and a mandatory
    /// `+`, `*`, or `?` operand.
    fn parse_macro_repetition(&mut self) -> Option<MacroMatch> {
        let dollar = self.eat(TokenKind::Dollar)?;
        let Some(pattern) = self.parse_macro_match_sequence() else {
            if !self.has_error() {
                let token = self.read();
                self.error(
                    DiagnosticKind::MacroDefinition,
                    token.span,
                    format!("expected repetition group after `$`, found {}", token.describe()),
                );
            }
            return None;
        };

        let mut delimiter: Option<Token> = None;
        loop {
            let token = self.read_token(false);
            let operand = match token.kind {
                TokenKind::Add => Some(RepetitionOperand::OneOrMore),
                TokenKind::Asterisk => Some(RepetitionOperand::ZeroOrMore),
                TokenKind::Question => Some(RepetitionOperand::ZeroOrOne),
                _ => None,
            };
            if let Some(operand) = operand {
                let span = Span::between(dollar.span, token.span);
                return Some(MacroMatch::Repetition(MacroRepetition {
                    pattern,
                    operand,
                    delimiter,
                    span,
                }));
            }
            if token.kind == TokenKind::Eof {
                self.error(
                    DiagnosticKind::MacroDefinition,
                    token.span,
                    "expected repetition operand (`+`, `*` or `?`), found end of file",
                );
                return None;
            }
            if delimiter.is_some() {
                self.error(
                    DiagnosticKind::MacroDefinition,
                    token.span,
                    "a repetition can only have one delimiter token",
                );
                return None;
            }
            delimiter = Some(token);
        }
    }

    /// `$name:kind` with a validated capture kind.
    fn parse_macro_capture(&mut self) -> Option<MacroMatch> {
        let name = self.eat(TokenKind::MacroIdent)?;
        self.expect_in(TokenKind::Colon, DiagnosticKind::MacroDefinition)?;
        let kind_token = self.expect_in(TokenKind::Ident, DiagnosticKind::MacroDefinition)?;
        let Some(kind) = CaptureKind::from_keyword(&kind_token.text) else {
            self.error(
                DiagnosticKind::MacroDefinition,
                kind_token.span,
                format!(
                    "unknown capture kind `{}` (expected `token`, `expr`, `stmt` or `block`)",
                    kind_token.text
                ),
            );
            return None;
        };
        let span = Span::between(name.span, kind_token.span);
        Some(MacroMatch::Capture {
            name: name.text,
            kind,
            span,
        })
    }

    /// A delimited template: literal token runs and nested `$( ... )` groups.
    /// A group's trailing operand is parsed like the pattern form but not
    /// stored; the repetition count comes from the positionally paired
    /// pattern group.
    fn parse_macro_template(&mut self) -> Option<Vec<TemplatePiece>> {
        let open = self.eat_any(&OPENING_DELIMITERS)?;
        let Some(close) = open.kind.closing() else {
            return None;
        };

        let mut depth = 1usize;
        let mut pieces = Vec::new();
        let mut run: Vec<Token> = Vec::new();
        loop {
            let token = self.read_token(false);
            match token.kind {
                TokenKind::Dollar if self.peek().kind.is_opening_delimiter() => {
                    let sub = self.parse_macro_template()?;
                    if !self.skip_template_operand() {
                        return None;
                    }
                    pieces.push(TemplatePiece::Literal(std::mem::take(&mut run)));
                    pieces.push(TemplatePiece::Repetition(sub));
                }
                kind if kind == open.kind => {
                    depth += 1;
                    run.push(token);
                }
                kind if kind == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.unread();
                        break;
                    }
                    run.push(token);
                }
                TokenKind::Eof => {
                    self.error(
                        DiagnosticKind::MacroDefinition,
                        token.span,
                        "unexpected end of file in macro template",
                    );
                    return None;
                }
                _ => run.push(token),
            }
        }
        pieces.push(TemplatePiece::Literal(run));

        self.expect_in(close, DiagnosticKind::MacroDefinition)?;
        Some(pieces)
    }

    fn skip_template_operand(&mut self) -> bool {
        let mut delimiter_seen = false;
        loop {
            let token = self.read_token(false);
            match token.kind {
                TokenKind::Add | TokenKind::Asterisk | TokenKind::Question => return true,
                TokenKind::Eof => {
                    self.error(
                        DiagnosticKind::MacroDefinition,
                        token.span,
                        "expected repetition operand (`+`, `*` or `?`), found end of file",
                    );
                    return false;
                }
                _ if delimiter_seen => {
                    self.error(
                        DiagnosticKind::MacroDefinition,
                        token.span,
                        "a repetition can only have one delimiter token",
                    );
                    return false;
                }
                _ => delimiter_seen = true,
            }
        }
    }

    // ------------------------------------------------------------------
    // calls
    // ------------------------------------------------------------------

    /// Resolve and expand one macro call. On success the expanded tokens sit
    /// at the front of the buffer and the caller re-reads; on failure a
    /// diagnostic is recorded and the call token stands as read.
    pub(crate) fn expand_macro_call(&mut self, call: &Token) -> bool {
        if self.expansion_depth >= MACRO_EXPANSION_LIMIT {
            self.error(
                DiagnosticKind::MacroExpansion,
                call.span,
                "macro expansion limit reached",
            );
            return false;
        }
        self.expansion_depth += 1;
        let expanded = self.expand_macro_call_inner(call);
        self.expansion_depth -= 1;
        expanded
    }

    fn expand_macro_call_inner(&mut self, call: &Token) -> bool {
        let name = match call.str_value() {
            Some(name) => name.to_string(),
            None => call.text.trim_end_matches('!').to_string(),
        };
        let Some(def) = self.macros.get(&name).cloned() else {
            self.error(
                DiagnosticKind::MacroCall,
                call.span,
                format!("no macro with name `{name}`"),
            );
            return false;
        };

        let mut matcher = MacroMatcher::new(&def);
        let mut end_span = call.span;

        if let Some(open) = self.eat_any(&OPENING_DELIMITERS) {
            let Some(close) = open.kind.closing() else {
                return false;
            };
            let mut depth = 1usize;
            loop {
                if matcher.accepts_kind(CaptureKind::Block) {
                    if let Some(block) = self.try_rule(|p| p.parse_block()) {
                        matcher.feed(&MacroValue::Block(block));
                        continue;
                    }
                }
                if matcher.accepts_kind(CaptureKind::Expr) {
                    if let Some(expr) = self.try_rule(|p| p.parse_expression()) {
                        matcher.feed(&MacroValue::Expr(expr));
                        continue;
                    }
                }
                if matcher.accepts_kind(CaptureKind::Stmt) {
                    if let Some(stmt) = self.try_rule(|p| p.parse_statement(true)) {
                        matcher.feed(&MacroValue::Stmt(stmt));
                        continue;
                    }
                }

                let token = self.read();
                match token.kind {
                    kind if kind == open.kind => {
                        depth += 1;
                        matcher.feed(&MacroValue::Token(token));
                    }
                    kind if kind == close => {
                        depth -= 1;
                        if depth == 0 {
                            self.unread();
                            break;
                        }
                        matcher.feed(&MacroValue::Token(token));
                    }
                    TokenKind::Eof => {
                        self.error(
                            DiagnosticKind::MacroCall,
                            token.span,
                            "unexpected end of file in macro call",
                        );
                        return false;
                    }
                    _ => matcher.feed(&MacroValue::Token(token)),
                }
            }
            match self.expect_in(close, DiagnosticKind::MacroCall) {
                Some(token) => end_span = token.span,
                None => return false,
            }
        }

        let call_span = Span::between(call.span, end_span);
        let Some((index, processor)) = matcher.into_matched() else {
            self.error(
                DiagnosticKind::MacroCall,
                call_span,
                format!("arguments to `{name}!` do not match any pattern"),
            );
            return false;
        };

        let template = &def.patterns[index].template;
        let tokens = match expander::expand(&processor, template) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.error(DiagnosticKind::MacroExpansion, call_span, err.message());
                return false;
            }
        };

        // Everything an expansion produces points at the call site.
        let tokens = tokens
            .into_iter()
            .map(|mut token| {
                token.span = call_span;
                token
            })
            .collect();
        self.return_to_buffer(tokens);
        true
    }

    /// Run a grammar rule speculatively: on failure the consumed tokens are
    /// replayed.
    fn try_rule<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.snapshot();
        match rule(self) {
            Some(value) => {
                self.commit();
                Some(value)
            }
            None => {
                self.restore();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(source: &str) -> MacroDef {
        let mut parser = Parser::new(source);
        let def = parser
            .parse_macro_definition()
            .unwrap_or_else(|| panic!("failed to parse definition: {source}"));
        assert!(!parser.has_error(), "definition had errors: {source}");
        def
    }

    fn definition_error(source: &str) -> String {
        let parser = Parser::new(source);
        let (_, diagnostics) = parser.parse_with_diagnostics();
        diagnostics
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| panic!("expected a diagnostic for: {source}"))
    }

    #[test]
    fn parses_pattern_shapes() {
        let def = definition("macro test { (foo $x:expr $($y:stmt);*):(bar) }");
        assert_eq!(def.name.text, "test");
        assert_eq!(def.patterns.len(), 1);

        let matches = &def.patterns[0].matches;
        assert_eq!(matches.len(), 3);
        assert!(matches!(&matches[0], MacroMatch::Literal(t) if t.text == "foo"));
        assert!(matches!(
            &matches[1],
            MacroMatch::Capture { name, kind: CaptureKind::Expr, .. } if name == "$x"
        ));
        match &matches[2] {
            MacroMatch::Repetition(rep) => {
                assert_eq!(rep.operand, RepetitionOperand::ZeroOrMore);
                assert_eq!(rep.delimiter.as_ref().map(|d| d.text.as_str()), Some(";"));
                assert_eq!(rep.pattern.len(), 1);
            }
            other => panic!("expected repetition, got {other:?}"),
        }
    }

    #[test]
    fn parses_multiple_patterns_in_order() {
        let def = definition("macro test { (foo):(1) (bar):(2) (baz):(3) }");
        assert_eq!(def.patterns.len(), 3);
    }

    #[test]
    fn template_groups_nest() {
        let def = definition("macro test { ($($x:token),*):(a $($x b $(c)*)* d) }");
        let template = &def.patterns[0].template;
        let groups = template
            .iter()
            .filter(|p| matches!(p, TemplatePiece::Repetition(_)))
            .count();
        assert_eq!(groups, 1);
    }

    #[test]
    fn second_delimiter_in_repetition_is_rejected() {
        let message = definition_error("macro test { ($(foo),;*):(bar) }");
        assert!(message.contains("one delimiter"), "got: {message}");
    }

    #[test]
    fn unknown_capture_kind_is_rejected() {
        let message = definition_error("macro test { ($x:wibble):(bar) }");
        assert!(message.contains("unknown capture kind"), "got: {message}");
    }

    #[test]
    fn missing_operand_at_eof_is_rejected() {
        let message = definition_error("macro test { ($(foo)");
        assert!(message.contains("operand"), "got: {message}");
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let message = definition_error("macro a { ():(1) }\nmacro a { ():(2) }");
        assert!(message.contains("already defined"), "got: {message}");
    }

    #[test]
    fn keyword_name_is_rejected() {
        let message = definition_error("macro for { ():(1) }");
        assert!(message.contains("reserved"), "got: {message}");
    }
}
