//! Expression grammar rules.
//!
//! Expressions are parsed as a unary expression followed by a loop of
//! binary operators. Multiplicative operators bind their right operand
//! as a unary expression; additive operators take a full expression,
//! which is what gives `a + b * c` the expected grouping.

use crate::ast::{is_keyword, CallArgument, Expr, MacroValue};
use crate::diagnostics::DiagnosticKind;
use crate::scanner::{TokenKind, TokenValue};
use crate::span::Span;

use super::Parser;

const VALUE_TOKENS: [TokenKind; 5] = [
    TokenKind::Ident,
    TokenKind::Boolean,
    TokenKind::Integer,
    TokenKind::Float,
    TokenKind::String,
];

const UNARY_PREFIX_OPERATORS: [TokenKind; 3] =
    [TokenKind::Add, TokenKind::Sub, TokenKind::Excl];

const UNARY_SUFFIX_OPERATORS: [TokenKind; 2] =
    [TokenKind::Increment, TokenKind::Decrement];

const BINARY_OPERATORS: [TokenKind; 4] = [
    TokenKind::Add,
    TokenKind::Sub,
    TokenKind::Asterisk,
    TokenKind::Slash,
];

const COMPARISON_OPERATORS: [TokenKind; 6] = [
    TokenKind::Equal,
    TokenKind::NotEqual,
    TokenKind::Less,
    TokenKind::Greater,
    TokenKind::LessOrEqual,
    TokenKind::GreaterOrEqual,
];

impl Parser<'_> {
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        let mut expression = self.parse_unary_expression()?;
        while let Some(binary) = self.parse_binary_expression(&expression) {
            expression = binary;
        }
        Some(expression)
    }

    fn parse_binary_expression(&mut self, left: &Expr) -> Option<Expr> {
        let operator = self.eat_any(&BINARY_OPERATORS)?;
        // `*` and `/` bind tighter than `+` and `-`: they only claim the
        // next unary expression as their right operand.
        let right = match operator.kind {
            TokenKind::Asterisk | TokenKind::Slash => self.parse_unary_expression(),
            _ => self.parse_expression(),
        };
        let Some(right) = right else {
            self.expression_expected();
            return None;
        };
        Some(Expr::Binary {
            operator,
            left: Box::new(left.clone()),
            right: Box::new(right),
        })
    }

    fn parse_unary_expression(&mut self) -> Option<Expr> {
        if let Some(operator) = self.eat_any(&UNARY_PREFIX_OPERATORS) {
            let Some(operand) = self.parse_unary_expression() else {
                self.expression_expected();
                return None;
            };
            return Some(Expr::Unary {
                operator,
                operand: Box::new(operand),
                prefix: true,
            });
        }

        let mut expression = if let Some(function) = self.parse_function_declaration() {
            Expr::Function(Box::new(function))
        } else if let Some(value) = self.parse_value_expression() {
            value
        } else {
            self.parse_substitution_expression()?
        };

        loop {
            if let Some(next) = self.parse_assignment(&expression) {
                expression = next;
                continue;
            }
            if let Some(next) = self.parse_call_expression(&expression) {
                expression = next;
                continue;
            }
            if let Some(next) = self.parse_member_expression(&expression) {
                expression = next;
                continue;
            }
            if let Some(next) = self.parse_comparison_expression(&expression) {
                expression = next;
                continue;
            }
            break;
        }

        if let Some(operator) = self.eat_any(&UNARY_SUFFIX_OPERATORS) {
            expression = Expr::Unary {
                operator,
                operand: Box::new(expression),
                prefix: false,
            };
        }
        Some(expression)
    }

    fn parse_value_expression(&mut self) -> Option<Expr> {
        let token = self.eat_any(&VALUE_TOKENS)?;
        if token.kind == TokenKind::Ident && is_keyword(&token.text) {
            self.reserved_keyword(&token);
            return None;
        }
        Some(Expr::Value(token))
    }

    fn parse_assignment(&mut self, target: &Expr) -> Option<Expr> {
        self.eat(TokenKind::Assign)?;
        let Some(value) = self.parse_expression() else {
            self.expression_expected();
            return None;
        };
        Some(Expr::Assign {
            target: Box::new(target.clone()),
            value: Box::new(value),
        })
    }

    fn parse_comparison_expression(&mut self, left: &Expr) -> Option<Expr> {
        let operator = self.eat_any(&COMPARISON_OPERATORS)?;
        let Some(right) = self.parse_expression() else {
            self.expression_expected();
            return None;
        };
        Some(Expr::Comparison {
            operator,
            left: Box::new(left.clone()),
            right: Box::new(right),
        })
    }

    fn parse_member_expression(&mut self, target: &Expr) -> Option<Expr> {
        self.eat(TokenKind::Period)?;
        let property = self.read();
        if property.kind != TokenKind::Ident {
            self.error(
                DiagnosticKind::Parse,
                property.span,
                format!("expected a property name, found {}", property.describe()),
            );
            return None;
        }
        if is_keyword(&property.text) {
            self.reserved_keyword(&property);
            return None;
        }
        Some(Expr::Member {
            target: Box::new(target.clone()),
            property,
        })
    }

    fn parse_call_expression(&mut self, callee: &Expr) -> Option<Expr> {
        self.eat(TokenKind::LParen)?;
        let mut arguments = Vec::new();
        loop {
            let Some(argument) = self.parse_call_argument() else {
                break;
            };
            arguments.push(argument);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RParen)?;
        Some(Expr::Call {
            callee: Box::new(callee.clone()),
            arguments,
            span: Span::between(callee.span(), close.span),
        })
    }

    fn parse_call_argument(&mut self) -> Option<CallArgument> {
        // `name: value` is a named argument; a lone identifier is just
        // the start of an expression, so the lookahead must roll back.
        let mut name = None;
        self.snapshot();
        match self.eat(TokenKind::Ident) {
            Some(ident) if self.eat(TokenKind::Colon).is_some() => {
                self.commit();
                if is_keyword(&ident.text) {
                    self.reserved_keyword(&ident);
                    return None;
                }
                name = Some(ident);
            }
            _ => self.restore(),
        }
        let value = self.parse_expression()?;
        Some(CallArgument { name, value })
    }

    fn parse_substitution_expression(&mut self) -> Option<Expr> {
        let token = self.eat(TokenKind::MacroIdent)?;
        match &token.value {
            Some(TokenValue::Node(node)) => match node.as_ref() {
                MacroValue::Expr(expression) => Some(expression.clone()),
                _ => {
                    self.unread();
                    None
                }
            },
            _ => {
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("no substitution value for `{}`", token.text),
                );
                None
            }
        }
    }

    pub(crate) fn expression_expected(&mut self) {
        let token = self.read();
        self.error(
            DiagnosticKind::Parse,
            token.span,
            format!("expected an expression, found {}", token.describe()),
        );
    }

    pub(crate) fn reserved_keyword(&mut self, token: &crate::scanner::Token) {
        self.error(
            DiagnosticKind::Parse,
            token.span,
            format!("`{}` is a reserved keyword", token.text),
        );
    }
}
