//! Shunting-yard conversion from tokens to postfix operations.
//!
//! Leaves go straight to the output. Operators wait on a stack until an
//! operator of lower precedence (or a closing bracket) arrives. Closing a
//! `[...]` or `{...}` emits COLLECT or COLLECT_OBJECT followed by a short
//! pipe, so the collector runs over whatever the bracket contents yield.

use std::iter;

use log::trace;

use crate::ast::expressions::Operation;
use crate::ast::operators;
use crate::ast::preferences::{Prefs, TraversePrefs};
use crate::ast::tokens::{Token, TokenKind};
use crate::parser::ParseError;

enum Pending {
    Operator(Operation),
    Open { kind: TokenKind, result_len: usize },
}

fn opener_for(closer: TokenKind) -> TokenKind {
    match closer {
        TokenKind::CloseCollect => TokenKind::OpenCollect,
        TokenKind::CloseCollectObject => TokenKind::OpenCollectObject,
        _ => TokenKind::OpenBracket,
    }
}

fn opening_char(kind: TokenKind) -> char {
    match kind {
        TokenKind::OpenCollect => '[',
        TokenKind::OpenCollectObject => '{',
        _ => '(',
    }
}

fn closing_char(kind: TokenKind) -> char {
    match kind {
        TokenKind::OpenCollect => ']',
        TokenKind::OpenCollectObject => '}',
        _ => ')',
    }
}

pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Operation>, ParseError> {
    let mut result: Vec<Operation> = Vec::new();
    let mut stack = vec![Pending::Open {
        kind: TokenKind::OpenBracket,
        result_len: 0,
    }];

    for token in tokens
        .into_iter()
        .chain(iter::once(Token::structural(TokenKind::CloseBracket)))
    {
        match token.kind {
            TokenKind::OpenBracket | TokenKind::OpenCollect | TokenKind::OpenCollectObject => {
                stack.push(Pending::Open {
                    kind: token.kind,
                    result_len: result.len(),
                });
            }
            TokenKind::CloseBracket | TokenKind::CloseCollect | TokenKind::CloseCollectObject => {
                let expected = opener_for(token.kind);
                loop {
                    match stack.pop() {
                        None => return Err(ParseError::MissingBracket(opening_char(expected))),
                        Some(Pending::Operator(op)) => result.push(op),
                        Some(Pending::Open { kind, result_len }) => {
                            if kind != expected {
                                return Err(ParseError::MissingBracket(closing_char(kind)));
                            }
                            close_collection(&mut result, kind, result_len, token.optional);
                            break;
                        }
                    }
                }
            }
            TokenKind::Operation => {
                let Some(op) = token.operation else {
                    return Err(ParseError::BadExpression);
                };
                if op.op_type.arity == 0 {
                    result.push(op);
                    continue;
                }
                while let Some(Pending::Operator(top)) = stack.last() {
                    let pops = top.op_type.precedence > op.op_type.precedence
                        || (top.op_type.precedence == op.op_type.precedence
                            && op.op_type.left_associative);
                    if !pops {
                        break;
                    }
                    if let Some(Pending::Operator(top)) = stack.pop() {
                        result.push(top);
                    }
                }
                stack.push(Pending::Operator(op));
            }
            TokenKind::TraverseArrayCollect => return Err(ParseError::BadExpression),
        }
    }

    if let Some(pending) = stack.pop() {
        let kind = match pending {
            Pending::Open { kind, .. } => kind,
            Pending::Operator(_) => TokenKind::OpenBracket,
        };
        return Err(ParseError::MissingBracket(closing_char(kind)));
    }

    trace!(
        "postfix: {}",
        result
            .iter()
            .map(|op| op.op_type.name)
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(result)
}

fn close_collection(
    result: &mut Vec<Operation>,
    kind: TokenKind,
    result_len: usize,
    optional: bool,
) {
    if kind == TokenKind::OpenBracket {
        return;
    }
    if result.len() == result_len {
        result.push(Operation::new(&operators::EMPTY));
    }
    let prefs = Prefs::Traverse(TraversePrefs {
        optional,
        ..TraversePrefs::default()
    });
    let collector = if kind == TokenKind::OpenCollect {
        &operators::COLLECT
    } else {
        &operators::COLLECT_OBJECT
    };
    result.push(Operation::new(collector).with_prefs(prefs));
    result.push(Operation::new(&operators::SHORT_PIPE));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn postfix(input: &str) -> String {
        to_postfix(tokenize(input).unwrap())
            .unwrap()
            .iter()
            .map(|op| op.op_type.name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_precedence() {
        assert_eq!(postfix("1 + 2 * 3"), "VALUE VALUE VALUE MULTIPLY ADD");
        assert_eq!(postfix(".a | .b , .c"), "TRAVERSE_PATH TRAVERSE_PATH TRAVERSE_PATH UNION PIPE");
    }

    #[test]
    fn test_left_associative_subtraction() {
        assert_eq!(postfix("5 - 2 - 1"), "VALUE VALUE SUBTRACT VALUE SUBTRACT");
    }

    #[test]
    fn test_empty_collect() {
        assert_eq!(postfix("[]"), "EMPTY COLLECT SHORT_PIPE");
        assert_eq!(postfix("{}"), "EMPTY COLLECT_OBJECT SHORT_PIPE");
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            postfix("select(.a == 1)"),
            "TRAVERSE_PATH VALUE EQUALS SELECT"
        );
    }

    #[test]
    fn test_unclosed_collect() {
        let err = to_postfix(tokenize("[1,2").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::MissingBracket(']'));
    }

    #[test]
    fn test_unopened_bracket() {
        let err = to_postfix(tokenize("1)").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::MissingBracket('('));
    }
}
