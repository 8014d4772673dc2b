use std::fmt;

use super::operators::{self, OperationType};
use super::preferences::Prefs;

/// A resolved operator together with its per-use payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub op_type: &'static OperationType,
    /// Path key, variable name, or literal text depending on the operator
    pub string_value: String,
    pub prefs: Prefs,
    /// `|=` rather than `=` for assignment operators
    pub update_assign: bool,
}

impl Operation {
    pub fn new(op_type: &'static OperationType) -> Self {
        Operation {
            op_type,
            string_value: String::new(),
            prefs: Prefs::None,
            update_assign: false,
        }
    }

    pub fn with_value(op_type: &'static OperationType, value: impl Into<String>) -> Self {
        Operation {
            string_value: value.into(),
            ..Operation::new(op_type)
        }
    }

    pub fn with_prefs(mut self, prefs: Prefs) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn is(&self, op_type: &OperationType) -> bool {
        self.op_type == op_type
    }
}

/// A node of the compiled expression tree.
///
/// Trees are immutable once built and can be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub operation: Operation,
    pub lhs: Option<Box<ExpressionNode>>,
    pub rhs: Option<Box<ExpressionNode>>,
}

impl ExpressionNode {
    pub fn leaf(operation: Operation) -> Self {
        ExpressionNode {
            operation,
            lhs: None,
            rhs: None,
        }
    }

    pub fn lhs(&self) -> Option<&ExpressionNode> {
        self.lhs.as_deref()
    }

    pub fn rhs(&self) -> Option<&ExpressionNode> {
        self.rhs.as_deref()
    }

    pub fn name(&self) -> &'static str {
        self.operation.op_type.name
    }

    pub fn is(&self, op_type: &OperationType) -> bool {
        self.operation.is(op_type)
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = &self.operation;
        if op.is(&operators::VALUE) {
            if let Prefs::Value(literal) = &op.prefs {
                if literal.tag == crate::node::TAG_STR {
                    return write!(f, "{:?}", literal.value);
                }
                return write!(f, "{}", literal.value);
            }
        }
        if op.is(&operators::TRAVERSE_PATH) {
            return write!(f, ".{}", op.string_value);
        }
        if op.is(&operators::GET_VARIABLE) {
            return write!(f, "${}", op.string_value);
        }
        if self.lhs.is_none() && self.rhs.is_none() {
            return write!(f, "{}", op.op_type.name);
        }
        write!(f, "{}(", op.op_type.name)?;
        match self.lhs() {
            Some(lhs) => write!(f, "{}", lhs)?,
            None => write!(f, "_")?,
        }
        write!(f, ", ")?;
        match self.rhs() {
            Some(rhs) => write!(f, "{}", rhs)?,
            None => write!(f, "_")?,
        }
        write!(f, ")")
    }
}

/// A compiled expression: the tree plus the text it came from.
///
/// An empty expression has no root and behaves as the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub root: Option<ExpressionNode>,
    pub source: String,
}

impl Expression {
    pub fn root(&self) -> Option<&ExpressionNode> {
        self.root.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_identity(&self) -> bool {
        self.root.is_none()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{}", root),
            None => write!(f, "."),
        }
    }
}
