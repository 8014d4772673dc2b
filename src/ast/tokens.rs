use super::expressions::Operation;
use super::operators::{self, OperationType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An operator, function, path segment or literal
    Operation,
    OpenBracket,
    CloseBracket,
    OpenCollect,
    CloseCollect,
    OpenCollectObject,
    CloseCollectObject,
    /// `.[`, split into self, traverse-array and `[` after scanning
    TraverseArrayCollect,
}

/// A lexical token.
///
/// # Examples
/// ```text
/// .a          TRAVERSE_PATH("a")
/// tag         GET_TAG, assignable as ASSIGN_TAG
/// [ ]         OpenCollect, CloseCollect
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub operation: Option<Operation>,
    /// Write counterpart used when the token is followed by `=` or `|=`
    pub assign_operation: Option<&'static OperationType>,
    /// A path or `[` directly after this token continues the traversal
    pub check_for_post_traverse: bool,
    /// `]?`
    pub optional: bool,
}

impl Token {
    pub fn structural(kind: TokenKind) -> Self {
        let check_for_post_traverse = matches!(
            kind,
            TokenKind::CloseBracket | TokenKind::CloseCollect | TokenKind::CloseCollectObject
        );
        Token {
            kind,
            operation: None,
            assign_operation: None,
            check_for_post_traverse,
            optional: false,
        }
    }

    pub fn operation(operation: Operation) -> Self {
        Token {
            kind: TokenKind::Operation,
            check_for_post_traverse: operation.op_type.check_for_post_traverse,
            operation: Some(operation),
            assign_operation: None,
            optional: false,
        }
    }

    pub fn with_assign(mut self, assign: Option<&'static OperationType>) -> Self {
        self.assign_operation = assign;
        self
    }

    pub fn is_op(&self, op_type: &OperationType) -> bool {
        self.operation.as_ref().is_some_and(|op| op.is(op_type))
    }

    pub fn is_path(&self) -> bool {
        self.is_op(&operators::TRAVERSE_PATH)
    }

    /// True for tokens after which a `-` is subtraction rather than a sign.
    pub fn ends_operand(&self) -> bool {
        match self.kind {
            TokenKind::Operation => self
                .operation
                .as_ref()
                .is_some_and(|op| op.op_type.arity == 0),
            TokenKind::CloseBracket | TokenKind::CloseCollect | TokenKind::CloseCollectObject => {
                true
            }
            _ => false,
        }
    }
}
