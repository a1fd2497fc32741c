//! # arity.rs
//!
//! Pre-pass over the token sequence that counts the arguments of every
//! bracketed construct before parsing starts.
//!
//! For each opening token of a function call, a vector literal or a matrix literal,
//! the number of top-level comma separated segments up to its matching closing token
//! is recorded. Nested constructs are skipped by keeping one frame per open bracket.
//! A brace literal whose first segment starts with another brace is a matrix, with
//! one slot per row.

use crate::errors::ParseError;
use crate::lexer::{Keyword, Symbol, Token, TokenKind};
use std::collections::HashMap;

/// The resolved shape of a bracketed construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    /// `name(a, b, …)`, including statement keywords such as `if(…)`.
    Call { arity: usize },

    /// `{a, b, …}`
    Vector { arity: usize },

    /// `{{…}, {…}, …}`
    Matrix { rows: usize },
}

/// Map from the index of an opening token to its resolved construct.
///
/// Plain grouping parentheses have no entry.
pub type Arities = HashMap<usize, Construct>;

/// Returns `true` if the token names something that can be called with `(`.
pub(crate) fn is_callable(token: &Token) -> bool {
    matches!(
        token.kind(),
        TokenKind::Identifier(_)
            | TokenKind::Keyword(Keyword::If)
            | TokenKind::Keyword(Keyword::For)
            | TokenKind::Keyword(Keyword::While)
            | TokenKind::Keyword(Keyword::Define)
            | TokenKind::Keyword(Keyword::Undefine)
    )
}

#[derive(Debug, PartialEq)]
enum FrameKind {
    Call,
    Group,
    Brace,
}

#[derive(Debug)]
struct Frame {
    open: usize,
    kind: FrameKind,
    commas: usize,
    is_empty: bool,
    starts_with_brace: bool,
}

impl Frame {
    fn arity(&self) -> usize {
        if self.is_empty { 0 } else { self.commas + 1 }
    }
}

/// Resolves the arity of every call, vector and matrix construct in `tokens`.
///
/// # Arguments
///
/// * `tokens` - The token sequence produced by [`crate::lexer::tokenize`].
///
/// # Returns
///
/// The map of constructs keyed by the index of their opening token, or a
/// [`ParseError`] if a comma appears outside of a call or brace literal, or if the
/// brackets do not pair up.
pub fn resolve(tokens: &[Token]) -> Result<Arities, ParseError> {
    let mut arities = Arities::new();
    let mut frames: Vec<Frame> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let opens = match token.kind() {
            TokenKind::Symbol(Symbol::LeftParen) => {
                let is_call = idx > 0 && is_callable(&tokens[idx - 1]);
                Some(if is_call { FrameKind::Call } else { FrameKind::Group })
            },
            TokenKind::Symbol(Symbol::LeftBrace) => Some(FrameKind::Brace),
            _ => None,
        };

        match token.kind() {
            TokenKind::Symbol(Symbol::RightParen) | TokenKind::Symbol(Symbol::RightBrace) => {
                let frame = frames.pop()
                    .ok_or(ParseError::MismatchedBracket { position: token.start() })?;
                let closes_brace = token.is_symbol(Symbol::RightBrace);
                match frame.kind {
                    FrameKind::Brace if closes_brace => {
                        let construct = if frame.starts_with_brace {
                            Construct::Matrix { rows: frame.arity() }
                        } else {
                            Construct::Vector { arity: frame.arity() }
                        };
                        arities.insert(frame.open, construct);
                    },
                    FrameKind::Call if !closes_brace => {
                        arities.insert(frame.open, Construct::Call { arity: frame.arity() });
                    },
                    FrameKind::Group if !closes_brace => {},
                    _ => return Err(ParseError::MismatchedBracket { position: token.start() }),
                }
            },
            TokenKind::Symbol(Symbol::Comma) => {
                match frames.last_mut() {
                    Some(frame) if frame.kind != FrameKind::Group => frame.commas += 1,
                    _ => return Err(ParseError::UnexpectedToken {
                        token: ",".into(),
                        position: token.start(),
                    }),
                }
            },
            _ => {},
        }

        if let Some(frame) = frames.last_mut()
            && !token.is_symbol(Symbol::RightParen)
            && !token.is_symbol(Symbol::RightBrace)
            && frame.open != idx
        {
            if frame.is_empty && frame.commas == 0 {
                frame.starts_with_brace = token.is_symbol(Symbol::LeftBrace);
            }
            frame.is_empty = false;
        }

        if let Some(kind) = opens {
            frames.push(Frame { open: idx, kind, commas: 0, is_empty: true, starts_with_brace: false });
        }
    }

    if let Some(frame) = frames.last() {
        return Err(ParseError::MismatchedBracket { position: tokens[frame.open].start() });
    }

    Ok(arities)
}

#[cfg(test)]
mod arity_tests {
    use super::*;
    use crate::lexer::tokenize;

    fn resolved(input: &str) -> Arities {
        resolve(&tokenize(input).unwrap()).unwrap()
    }

    #[test]
    fn test_call_arity() {
        let arities = resolved("max(1, 2, 3)");
        assert_eq!(arities.get(&1), Some(&Construct::Call { arity: 3 }));
        assert_eq!(arities.len(), 1);
    }

    #[test]
    fn test_empty_call() {
        let arities = resolved("f()");
        assert_eq!(arities.get(&1), Some(&Construct::Call { arity: 0 }));
    }

    #[test]
    fn test_nested_calls_are_skipped() {
        // max ( 1 , min ( 2 , 3 ) , 4 )
        // 0   1 2 3 4   5 6 7 8 9 10 11 12
        let arities = resolved("max(1, min(2, 3), 4)");
        assert_eq!(arities.get(&1), Some(&Construct::Call { arity: 3 }));
        assert_eq!(arities.get(&5), Some(&Construct::Call { arity: 2 }));
    }

    #[test]
    fn test_grouping_parentheses_have_no_entry() {
        let arities = resolved("(1 + 2) * 3");
        assert!(arities.is_empty());
    }

    #[test]
    fn test_statement_keywords_are_calls() {
        let arities = resolved("if(x, 1, 2)");
        assert_eq!(arities.get(&1), Some(&Construct::Call { arity: 3 }));
    }

    #[test]
    fn test_vector_and_matrix() {
        let arities = resolved("{1, 2, 3}");
        assert_eq!(arities.get(&0), Some(&Construct::Vector { arity: 3 }));

        let arities = resolved("{{1, 2}, {3, 4}, {5, 6}}");
        assert_eq!(arities.get(&0), Some(&Construct::Matrix { rows: 3 }));
        assert_eq!(arities.get(&1), Some(&Construct::Vector { arity: 2 }));

        let arities = resolved("{}");
        assert_eq!(arities.get(&0), Some(&Construct::Vector { arity: 0 }));
    }

    #[test]
    fn test_vector_of_expressions_is_not_a_matrix() {
        let arities = resolved("{1, {2}}");
        assert_eq!(arities.get(&0), Some(&Construct::Vector { arity: 2 }));
    }

    #[test]
    fn test_comma_outside_call() {
        let tokens = tokenize("(1, 2)").unwrap();
        assert_eq!(
            resolve(&tokens),
            Err(ParseError::UnexpectedToken { token: ",".into(), position: 2 })
        );
        let tokens = tokenize("1, 2").unwrap();
        assert!(resolve(&tokens).is_err());
    }
}
