use std::fmt;

use log::debug;

use crate::ast::expressions::{Expression, ExpressionNode, Operation};
use crate::lexer::{LexError, Lexer};
use crate::postfix::to_postfix;

/// Errors raised while compiling an expression. Any of them means the
/// expression text is not valid; nothing has been evaluated yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    /// A bracket was never closed or never opened; carries the missing character
    MissingBracket(char),
    /// An operator did not get the operands it needs
    Arity(String),
    /// Operands left over with no operator joining them
    BadExpression,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => write!(f, "{}", err),
            ParseError::MissingBracket(c) => {
                write!(f, "Bad expression, could not find matching `{}`", c)
            }
            ParseError::Arity(msg) => write!(f, "{}", msg),
            ParseError::BadExpression => {
                write!(f, "Bad expression, please check expression syntax")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

pub struct Parser {
    lexer: Lexer,
    source: String,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            source: source.to_string(),
        }
    }

    /// Compiles the whole input. Empty input compiles to the identity.
    pub fn parse(self) -> Result<Expression, ParseError> {
        let tokens = self.lexer.tokenize()?;
        let postfix = to_postfix(tokens)?;
        let root = build_tree(postfix)?;
        if let Some(root) = &root {
            debug!("compiled '{}' to {}", self.source, root);
        }
        Ok(Expression {
            root,
            source: self.source,
        })
    }
}

/// Compiles expression text into an evaluable tree.
///
/// # Examples
///
/// ```
/// use tansy_lang::parser::parse_expression;
///
/// let expr = parse_expression(".a | .b").unwrap();
/// assert_eq!(expr.to_string(), "PIPE(.a, .b)");
/// ```
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    Parser::new(source).parse()
}

fn build_tree(postfix: Vec<Operation>) -> Result<Option<ExpressionNode>, ParseError> {
    let mut stack: Vec<ExpressionNode> = Vec::new();

    for op in postfix {
        let name = op.op_type.name;
        let arity = op.op_type.arity;
        let mut node = ExpressionNode::leaf(op);
        match arity {
            0 => {}
            1 => {
                let rhs = stack.pop().ok_or_else(|| {
                    ParseError::Arity(format!("'{}' expects 1 arg but received none", name))
                })?;
                node.rhs = Some(Box::new(rhs));
            }
            _ => {
                if stack.len() < 2 {
                    return Err(ParseError::Arity(format!(
                        "'{}' expects 2 args but there is {}",
                        name,
                        stack.len()
                    )));
                }
                let rhs = stack.pop();
                let lhs = stack.pop();
                node.rhs = rhs.map(Box::new);
                node.lhs = lhs.map(Box::new);
            }
        }
        stack.push(node);
    }

    match stack.len() {
        0 => Ok(None),
        1 => Ok(stack.pop()),
        _ => Err(ParseError::BadExpression),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(input: &str) -> String {
        parse_expression(input).unwrap().to_string()
    }

    #[test]
    fn test_empty_is_identity() {
        let expr = parse_expression("").unwrap();
        assert!(expr.is_identity());
        assert_eq!(expr.to_string(), ".");
    }

    #[test]
    fn test_nested_paths() {
        assert_eq!(compile(".a.b"), "SHORT_PIPE(.a, .b)");
    }

    #[test]
    fn test_assignment_binds_looser_than_arithmetic() {
        assert_eq!(compile(".a = .a + 1"), "ASSIGN(.a, ADD(.a, 1))");
    }

    #[test]
    fn test_missing_operand() {
        let err = parse_expression("select").unwrap_err();
        assert_eq!(
            err,
            ParseError::Arity("'SELECT' expects 1 arg but received none".to_string())
        );
    }

    #[test]
    fn test_dangling_operands() {
        assert_eq!(parse_expression("1 2").unwrap_err(), ParseError::BadExpression);
    }
}
