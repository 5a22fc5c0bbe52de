//! Statement and block grammar rules.

use crate::ast::{
    is_keyword, Block, ForLoop, IfStatement, MacroValue, Node, Stmt, VariableDeclaration,
};
use crate::diagnostics::DiagnosticKind;
use crate::scanner::{TokenKind, TokenValue};
use crate::span::Span;

use super::Parser;

impl Parser<'_> {
    /// `in_block` gates statements that only make sense inside a block,
    /// which keeps `if` and `for` out of loop clauses.
    pub(crate) fn parse_statement(&mut self, in_block: bool) -> Option<Stmt> {
        if in_block {
            if let Some(for_loop) = self.parse_for_loop() {
                return Some(Stmt::For(Box::new(for_loop)));
            }
            if self.has_error() {
                return None;
            }
            if let Some(if_statement) = self.parse_if_statement() {
                return Some(Stmt::If(Box::new(if_statement)));
            }
            if self.has_error() {
                return None;
            }
        }
        if let Some(statement) = self.parse_substitution_statement() {
            return Some(statement);
        }
        self.parse_variable_declaration()
    }

    pub(crate) fn parse_statement_or_expression(&mut self, in_block: bool) -> Option<Node> {
        if let Some(statement) = self.parse_statement(in_block) {
            return Some(Node::Stmt(statement));
        }
        if self.has_error() {
            return None;
        }
        self.parse_expression().map(Node::Expr)
    }

    fn parse_if_statement(&mut self) -> Option<IfStatement> {
        let keyword = self.eat_keyword("if")?;
        let Some(condition) = self.parse_expression() else {
            self.expression_expected();
            return None;
        };
        let Some(then_block) = self.parse_block() else {
            self.block_expected();
            return None;
        };

        let mut else_block = None;
        if let Some(else_token) = self.eat_keyword("else") {
            if let Some(chained) = self.parse_if_statement() {
                // `else if` becomes an else block holding the nested if.
                let span = Span::between(else_token.span, chained.span);
                else_block = Some(Block {
                    body: vec![Node::Stmt(Stmt::If(Box::new(chained)))],
                    span,
                });
            } else if self.has_error() {
                return None;
            } else if let Some(block) = self.parse_block() {
                else_block = Some(block);
            } else {
                let token = self.read();
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("expected `if` or a block after `else`, found {}", token.describe()),
                );
                return None;
            }
        }

        let end = else_block.as_ref().map_or(then_block.span, |block| block.span);
        Some(IfStatement {
            condition,
            then_block,
            else_block,
            span: Span::between(keyword.span, end),
        })
    }

    fn parse_for_loop(&mut self) -> Option<ForLoop> {
        let keyword = self.eat_keyword("for")?;
        let mut init = None;
        let mut after = None;

        let first = self.parse_statement_or_expression(false);
        if self.has_error() {
            return None;
        }
        let found_first = first.is_some();
        let token = self.read();
        let condition = match token.kind {
            TokenKind::LBrace => {
                // `for cond { }` and the bare `for { }` loop.
                self.unread();
                match first {
                    Some(Node::Expr(expression)) => Some(expression),
                    Some(other) => {
                        self.error(
                            DiagnosticKind::Parse,
                            other.span(),
                            "a for loop condition must be an expression".to_string(),
                        );
                        return None;
                    }
                    None => None,
                }
            }
            TokenKind::Semicolon => {
                init = first.map(Box::new);
                let Some(found) = self.parse_expression() else {
                    self.expression_expected();
                    return None;
                };
                self.expect(TokenKind::Semicolon)?;
                after = self.parse_statement_or_expression(false).map(Box::new);
                if self.has_error() {
                    return None;
                }
                Some(found)
            }
            _ => {
                let expected = if found_first {
                    "`;` or a block"
                } else {
                    "a loop clause, `;` or a block"
                };
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("expected {expected}, found {}", token.describe()),
                );
                return None;
            }
        };

        let Some(body) = self.parse_block() else {
            self.block_expected();
            return None;
        };
        let span = Span::between(keyword.span, body.span);
        Some(ForLoop {
            init,
            condition,
            after,
            body,
            span,
        })
    }

    pub(crate) fn parse_variable_declaration(&mut self) -> Option<Stmt> {
        let keyword = self.read();
        let constant = match keyword.kind {
            TokenKind::Ident if keyword.text == "var" => false,
            TokenKind::Ident if keyword.text == "const" => true,
            _ => {
                self.unread();
                return None;
            }
        };

        if self.peek().kind == TokenKind::LParen {
            let (declarations, close) = self.parse_variable_declaration_group(constant)?;
            return Some(Stmt::MultiVar {
                declarations,
                span: Span::between(keyword.span, close.span),
            });
        }

        let Some(mut declaration) = self.parse_single_variable_declaration(constant) else {
            if !self.has_error() {
                let token = self.read();
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("expected a variable name, found {}", token.describe()),
                );
            }
            return None;
        };
        declaration.span = Span::between(keyword.span, declaration.span);
        Some(Stmt::Var(declaration))
    }

    fn parse_variable_declaration_group(
        &mut self,
        constant: bool,
    ) -> Option<(Vec<VariableDeclaration>, crate::scanner::Token)> {
        self.expect(TokenKind::LParen)?;
        let mut declarations = Vec::new();
        loop {
            let found = match self.parse_single_variable_declaration(constant) {
                Some(declaration) => {
                    declarations.push(declaration);
                    true
                }
                None => false,
            };
            if self.has_error() {
                return None;
            }
            let token = self.read();
            match token.kind {
                TokenKind::RParen => return Some((declarations, token)),
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

    fn parse_single_variable_declaration(
        &mut self,
        constant: bool,
    ) -> Option<VariableDeclaration> {
        let name = self.eat(TokenKind::Ident)?;
        if is_keyword(&name.text) {
            self.reserved_keyword(&name);
            return None;
        }

        let mut ty = None;
        let token = self.read();
        match token.kind {
            TokenKind::Colon => {
                let type_token = self.parse_type()?;
                let end = type_token.span;
                ty = Some(type_token);
                if self.eat(TokenKind::Assign).is_none() {
                    // Typed declaration without an initializer.
                    let span = Span::between(name.span, end);
                    return Some(VariableDeclaration {
                        name,
                        ty,
                        value: None,
                        constant,
                        span,
                    });
                }
            }
            TokenKind::Assign => {}
            _ => {
                self.error(
                    DiagnosticKind::Parse,
                    token.span,
                    format!("expected `:` or `=`, found {}", token.describe()),
                );
                return None;
            }
        }

        let Some(value) = self.parse_expression() else {
            self.expression_expected();
            return None;
        };
        let span = Span::between(name.span, value.span());
        Some(VariableDeclaration {
            name,
            ty,
            value: Some(value),
            constant,
            span,
        })
    }

    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        if let Some(block) = self.parse_substitution_block() {
            return Some(block);
        }
        let open = self.eat(TokenKind::LBrace)?;
        let mut body = Vec::new();
        let close = loop {
            if let Some(node) = self.parse_statement_or_expression(true) {
                body.push(node);
                continue;
            }
            if self.has_error() {
                return None;
            }
            match self.eat(TokenKind::RBrace) {
                Some(token) => break token,
                None => {
                    let token = self.read();
                    self.error(
                        DiagnosticKind::Parse,
                        token.span,
                        format!("expected a statement or `}}`, found {}", token.describe()),
                    );
                    return None;
                }
            }
        };
        Some(Block {
            body,
            span: Span::between(open.span, close.span),
        })
    }

    fn parse_substitution_statement(&mut self) -> Option<Stmt> {
        let token = self.eat(TokenKind::MacroIdent)?;
        match &token.value {
            Some(TokenValue::Node(node)) => match node.as_ref() {
                MacroValue::Stmt(statement) => Some(statement.clone()),
                _ => {
                    self.unread();
                    None
                }
            },
            _ => {
                self.unread();
                None
            }
        }
    }

    fn parse_substitution_block(&mut self) -> Option<Block> {
        let token = self.eat(TokenKind::MacroIdent)?;
        match &token.value {
            Some(TokenValue::Node(node)) => match node.as_ref() {
                MacroValue::Block(block) => Some(block.clone()),
                _ => {
                    self.unread();
                    None
                }
            },
            _ => {
                self.unread();
                None
            }
        }
    }

    pub(crate) fn block_expected(&mut self) {
        let token = self.read();
        self.error(
            DiagnosticKind::Parse,
            token.span,
            format!("expected a block, found {}", token.describe()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_of(source: &str) -> Stmt {
        let mut parser = Parser::new(source);
        let statement = parser.parse_statement(true).unwrap();
        assert!(!parser.has_error(), "unexpected diagnostics for {source:?}");
        statement
    }

    #[test]
    fn variable_declaration_with_type_and_value() {
        let Stmt::Var(declaration) = statement_of("var x: int = 1") else {
            panic!("expected a variable declaration");
        };
        assert_eq!(declaration.name.text, "x");
        assert_eq!(declaration.ty.as_ref().unwrap().text, "int");
        assert!(declaration.value.is_some());
        assert!(!declaration.constant);
    }

    #[test]
    fn typed_declaration_without_initializer() {
        let Stmt::Var(declaration) = statement_of("var x: int") else {
            panic!("expected a variable declaration");
        };
        assert!(declaration.value.is_none());
    }

    #[test]
    fn constant_declaration() {
        let Stmt::Var(declaration) = statement_of("const limit = 10") else {
            panic!("expected a variable declaration");
        };
        assert!(declaration.constant);
        assert!(declaration.ty.is_none());
    }

    #[test]
    fn grouped_variable_declarations() {
        let Stmt::MultiVar { declarations, .. } = statement_of("var (a = 1, b: int = 2)") else {
            panic!("expected a declaration group");
        };
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].name.text, "a");
        assert_eq!(declarations[1].ty.as_ref().unwrap().text, "int");
    }

    #[test]
    fn declaration_without_type_or_value_is_rejected() {
        let mut parser = Parser::new("var x 1");
        assert!(parser.parse_statement(true).is_none());
        assert!(parser.has_error());
    }

    #[test]
    fn if_with_else_if_chain() {
        let Stmt::If(statement) = statement_of("if a { } else if b { } else { }") else {
            panic!("expected an if statement");
        };
        let chained = statement.else_block.as_ref().unwrap();
        assert_eq!(chained.body.len(), 1);
        let Node::Stmt(Stmt::If(inner)) = &chained.body[0] else {
            panic!("expected a nested if");
        };
        assert!(inner.else_block.is_some());
    }

    #[test]
    fn full_for_loop() {
        let Stmt::For(for_loop) = statement_of("for var i = 0; i < 10; i++ { }") else {
            panic!("expected a for loop");
        };
        assert!(for_loop.init.is_some());
        assert!(for_loop.condition.is_some());
        assert!(for_loop.after.is_some());
    }

    #[test]
    fn condition_only_for_loop() {
        let Stmt::For(for_loop) = statement_of("for running { }") else {
            panic!("expected a for loop");
        };
        assert!(for_loop.init.is_none());
        assert!(for_loop.condition.is_some());
        assert!(for_loop.after.is_none());
    }

    #[test]
    fn bare_for_loop() {
        let Stmt::For(for_loop) = statement_of("for { }") else {
            panic!("expected a for loop");
        };
        assert!(for_loop.condition.is_none());
    }

    #[test]
    fn unterminated_block_is_rejected() {
        let mut parser = Parser::new("if a { var x = 1");
        assert!(parser.parse_statement(true).is_none());
        assert!(parser.has_error());
    }
}
