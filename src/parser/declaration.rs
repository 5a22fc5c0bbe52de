//! Function declaration grammar rules.

use crate::ast::{is_keyword, FunctionDeclaration, Parameter};
use crate::diagnostics::DiagnosticKind;
use crate::scanner::{Token, TokenKind};
use crate::span::Span;

use super::Parser;

impl Parser<'_> {
    /// Parses `fn name(params) { .. }`. The name is optional, which is
    /// what allows function expressions.
    pub(crate) fn parse_function_declaration(&mut self) -> Option<FunctionDeclaration> {
        let keyword = self.eat_keyword("fn")?;

        let mut name = None;
        let token = self.read();
        match token.kind {
            TokenKind::Ident => {
                if is_keyword(&token.text) {
                    self.reserved_keyword(&token);
                    return None;
                }
                name = Some(token);
            }
            TokenKind::LParen => self.unread(),
            _ => {
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("expected a function name or `(`, found {}", token.describe()),
                );
                return None;
            }
        }

        let parameters = self.parse_parameter_list()?;
        let Some(body) = self.parse_block() else {
            self.block_expected();
            return None;
        };
        let span = Span::between(keyword.span, body.span);
        Some(FunctionDeclaration {
            name,
            parameters,
            body,
            span,
        })
    }

    fn parse_parameter_list(&mut self) -> Option<Vec<Parameter>> {
        self.expect(TokenKind::LParen)?;
        let mut parameters = Vec::new();
        loop {
            let found = match self.parse_parameter() {
                Some(parameter) => {
                    parameters.push(parameter);
                    true
                }
                None => false,
            };
            if self.has_error() {
                return None;
            }
            let token = self.read();
            match token.kind {
                TokenKind::RParen => return Some(parameters),
                TokenKind::Comma if found => {}
                _ => {
                    self.error(
                        DiagnosticKind::Parse,
                        token.span,
                        format!("expected `)` or `,`, found {}", token.describe()),
                    );
                    return None;
                }
            }
        }
    }

    fn parse_parameter(&mut self) -> Option<Parameter> {
        let name = self.eat(TokenKind::Ident)?;
        if is_keyword(&name.text) {
            self.reserved_keyword(&name);
            return None;
        }

        let mut ty = None;
        let mut default_value = None;
        let mut end = name.span;
        match self.eat_any(&[TokenKind::Colon, TokenKind::Assign]) {
            Some(token) if token.kind == TokenKind::Colon => {
                let type_token = self.parse_type()?;
                end = type_token.span;
                ty = Some(type_token);
                if self.eat(TokenKind::Assign).is_some() {
                    let Some(value) = self.parse_expression() else {
                        self.expression_expected();
                        return None;
                    };
                    end = value.span();
                    default_value = Some(value);
                }
            }
            Some(_) => {
                let Some(value) = self.parse_expression() else {
                    self.expression_expected();
                    return None;
                };
                end = value.span();
                default_value = Some(value);
            }
            None => {}
        }

        let span = Span::between(name.span, end);
        Some(Parameter {
            name,
            ty,
            default_value,
            span,
        })
    }

    pub(crate) fn parse_type(&mut self) -> Option<Token> {
        let token = self.read();
        if token.kind != TokenKind::Ident {
            self.error(
                DiagnosticKind::Parse,
                token.span,
                format!("expected a type name, found {}", token.describe()),
            );
            return None;
        }
        if is_keyword(&token.text) {
            self.reserved_keyword(&token);
            return None;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_of(source: &str) -> FunctionDeclaration {
        let mut parser = Parser::new(source);
        let declaration = parser.parse_function_declaration().unwrap();
        assert!(!parser.has_error(), "unexpected diagnostics for {source:?}");
        declaration
    }

    #[test]
    fn named_function_with_typed_parameters() {
        let declaration = function_of("fn add(a: int, b: int) { a + b }");
        assert_eq!(declaration.name.as_ref().unwrap().text, "add");
        assert_eq!(declaration.parameters.len(), 2);
        assert_eq!(declaration.parameters[0].ty.as_ref().unwrap().text, "int");
    }

    #[test]
    fn parameter_defaults() {
        let declaration = function_of("fn greet(name: string = \"you\", count = 1) { }");
        assert!(declaration.parameters[0].default_value.is_some());
        assert!(declaration.parameters[1].ty.is_none());
        assert!(declaration.parameters[1].default_value.is_some());
    }

    #[test]
    fn anonymous_function() {
        let declaration = function_of("fn (x) { x }");
        assert!(declaration.name.is_none());
        assert_eq!(declaration.parameters.len(), 1);
        assert!(declaration.parameters[0].ty.is_none());
    }

    #[test]
    fn empty_parameter_list() {
        let declaration = function_of("fn main() { }");
        assert!(declaration.parameters.is_empty());
    }

    #[test]
    fn keyword_parameter_name_is_rejected() {
        let mut parser = Parser::new("fn f(if: int) { }");
        assert!(parser.parse_function_declaration().is_none());
        assert!(parser.has_error());
    }

    #[test]
    fn missing_parameter_list_is_rejected() {
        let mut parser = Parser::new("fn broken { }");
        assert!(parser.parse_function_declaration().is_none());
        assert!(parser.has_error());
    }
}
