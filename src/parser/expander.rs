//! Template expansion for a matched macro pattern.
//!
//! Literal runs repeat once per completed loop of the processor they expand
//! under, with metavariables substituted per iteration. A raw token capture
//! splices in as the token itself; parsed captures ride along as synthetic
//! metavariable tokens carrying the node, which the grammar's substitution
//! rules unwrap. Template repetition groups pair with the pattern's repetition
//! groups positionally.

use crate::ast::{MacroValue, TemplatePiece};
use crate::scanner::{Token, TokenKind, TokenValue};

use super::MacroProcessor;

#[derive(Debug, PartialEq)]
pub(crate) enum ExpandError {
    MissingCapture { name: String },
    MissingGroup,
}

impl ExpandError {
    pub(crate) fn message(&self) -> String {
        match self {
            ExpandError::MissingCapture { name } => {
                format!("no capture bound for metavariable `{name}`")
            }
            ExpandError::MissingGroup => {
                "template repetition has no matching pattern group".to_string()
            }
        }
    }
}

/// Expand a template against a finalized processor.
pub(crate) fn expand(
    processor: &MacroProcessor,
    template: &[TemplatePiece],
) -> Result<Vec<Token>, ExpandError> {
    let mut tokens = Vec::new();
    expand_pieces(processor, template, &[], &mut tokens)?;
    Ok(tokens)
}

fn expand_pieces(
    processor: &MacroProcessor,
    pieces: &[TemplatePiece],
    scopes: &[&MacroProcessor],
    out: &mut Vec<Token>,
) -> Result<(), ExpandError> {
    let mut group_index = 0;
    for piece in pieces {
        match piece {
            TemplatePiece::Repetition(sub_pieces) => {
                let group = processor
                    .template_group(group_index)
                    .ok_or(ExpandError::MissingGroup)?;
                group_index += 1;
                let mut inner_scopes: Vec<&MacroProcessor> = scopes.to_vec();
                inner_scopes.push(processor);
                expand_pieces(group, sub_pieces, &inner_scopes, out)?;
            }
            TemplatePiece::Literal(tokens) => {
                // A pattern that never looped still expands its template once.
                let repeats = processor.loops().max(1);
                for iteration in 0..repeats {
                    for token in tokens {
                        if token.kind == TokenKind::MacroIdent {
                            let value = lookup(processor, scopes, &token.text, iteration)
                                .ok_or_else(|| ExpandError::MissingCapture {
                                    name: token.text.clone(),
                                })?;
                            out.push(splice_token(token, value));
                        } else {
                            out.push(token.clone());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Find the value for a metavariable: this processor's captures first, then
/// the enclosing repetition scopes. Indices past the end clamp to the last
/// value, so an outer-scope capture repeats under an inner group.
fn lookup<'a>(
    processor: &'a MacroProcessor,
    scopes: &[&'a MacroProcessor],
    name: &str,
    index: usize,
) -> Option<&'a MacroValue> {
    if let Some(values) = processor.values_of(name) {
        return values.get(index.min(values.len() - 1));
    }
    for scope in scopes.iter().rev() {
        if let Some(values) = scope.values_of(name) {
            return values.get(index.min(values.len() - 1));
        }
    }
    None
}

fn splice_token(template_token: &Token, value: &MacroValue) -> Token {
    match value {
        MacroValue::Token(token) => token.clone(),
        parsed => Token {
            kind: TokenKind::MacroIdent,
            text: template_token.text.clone(),
            value: Some(TokenValue::Node(Box::new(parsed.clone()))),
            span: template_token.span,
        },
    }
}
