use std::fmt;

use log::trace;

use crate::ast::expressions::{Expression, ExpressionNode};
use crate::config::Config;
use crate::context::Context;
use crate::node::{Arena, Kind, NodeId, TAG_BOOL, TAG_NULL};
use crate::parser::ParseError;

/// Errors that can occur while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression (or one passed to `eval`) failed to compile
    Syntax(ParseError),

    /// Operator applied to node kinds or tags it does not support
    TypeError(String),

    /// An operand produced the wrong number of results
    ArityError(String),

    /// Raised by the `error` operator
    UserError(String),

    /// A file could not be read or decoded
    IoError(String),

    /// The operation was switched off in the configuration
    Disabled(String),

    /// Integer division or modulo by zero
    DivisionByZero(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax(err) => write!(f, "{}", err),
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::ArityError(msg) => write!(f, "Arity error: {}", msg),
            EvalError::UserError(msg) => write!(f, "{}", msg),
            EvalError::IoError(msg) => write!(f, "IO error: {}", msg),
            EvalError::Disabled(msg) => write!(f, "Disabled: {}", msg),
            EvalError::DivisionByZero(msg) => write!(f, "Division by zero: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::Syntax(err)
    }
}

/// Walks compiled expression trees over the documents held in its arena.
///
/// The evaluator owns the [`Arena`]: inputs are decoded into it, every
/// operator allocates its results in it, and assignments mutate it in place.
pub struct Evaluator {
    arena: Arena,
    config: Config,
}

impl Evaluator {
    pub fn new(config: Config) -> Self {
        Evaluator {
            arena: Arena::new(),
            config,
        }
    }

    pub fn with_arena(arena: Arena, config: Config) -> Self {
        Evaluator { arena, config }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_arena(self) -> Arena {
        self.arena
    }

    /// Evaluates `expr` against each input in turn and concatenates the results.
    ///
    /// # Examples
    ///
    /// ```
    /// use tansy_lang::{Config, Evaluator, parse_expression};
    ///
    /// let mut evaluator = Evaluator::new(Config::default());
    /// let two = evaluator.arena_mut().new_int(2);
    /// let expr = parse_expression(". * 3").unwrap();
    /// let results = evaluator.evaluate(&expr, &[two]).unwrap();
    /// assert_eq!(evaluator.arena().get(results[0]).value, "6");
    /// ```
    pub fn evaluate(
        &mut self,
        expr: &Expression,
        inputs: &[NodeId],
    ) -> Result<Vec<NodeId>, EvalError> {
        let context = Context::new(inputs.to_vec());
        Ok(self.eval(&context, expr.root())?.matches)
    }

    /// Evaluates `expr` once with every input in a single stream, so
    /// operators such as `.[0] * .[1]` can combine documents.
    pub fn evaluate_together(
        &mut self,
        expr: &Expression,
        inputs: &[NodeId],
    ) -> Result<Vec<NodeId>, EvalError> {
        for id in inputs {
            self.arena.get_mut(*id).evaluate_together = true;
        }
        self.evaluate(expr, inputs)
    }

    /// Evaluates one subtree. A missing subtree is the identity.
    pub fn eval(
        &mut self,
        context: &Context,
        expr: Option<&ExpressionNode>,
    ) -> Result<Context, EvalError> {
        let Some(expr) = expr else {
            return Ok(context.clone());
        };
        trace!(
            "{} on {} match(es){}",
            expr.name(),
            context.len(),
            if context.dont_auto_create { " (read-only)" } else { "" }
        );
        (expr.operation.op_type.handler)(self, context, expr)
    }

    pub fn eval_readonly(
        &mut self,
        context: &Context,
        expr: Option<&ExpressionNode>,
    ) -> Result<Context, EvalError> {
        self.eval(&context.clone().readonly(), expr)
    }

    /// Evaluates a write target: missing keys and sequence slots are
    /// created on the way.
    pub fn eval_writable(
        &mut self,
        context: &Context,
        expr: Option<&ExpressionNode>,
    ) -> Result<Context, EvalError> {
        self.eval(&context.clone().writable(), expr)
    }

    pub fn eval_single(
        &mut self,
        context: &Context,
        id: NodeId,
        expr: Option<&ExpressionNode>,
    ) -> Result<Context, EvalError> {
        self.eval(&context.single_child(id), expr)
    }

    pub fn eval_single_readonly(
        &mut self,
        context: &Context,
        id: NodeId,
        expr: Option<&ExpressionNode>,
    ) -> Result<Context, EvalError> {
        self.eval(&context.single_readonly_child(id), expr)
    }

    /// Null and `false` are falsy; every other node is truthy.
    pub fn truthy(&self, id: NodeId) -> bool {
        let node = self.arena.get(self.arena.resolve_alias(id));
        if node.kind != Kind::Scalar {
            return true;
        }
        match node.tag.as_str() {
            TAG_NULL => false,
            TAG_BOOL => node.value != "false",
            _ => true,
        }
    }

    /// True when every match was loaded for evaluate-together mode (and for
    /// an empty stream).
    pub fn all_together(&self, context: &Context) -> bool {
        context
            .matches
            .iter()
            .all(|id| self.arena.get(*id).evaluate_together)
    }

    /// Date layout in effect for `context`.
    pub fn date_time_layout(&self, context: &Context) -> String {
        context
            .date_time_layout
            .clone()
            .unwrap_or_else(|| self.config.date_time_layout.clone())
    }

    /// Runs a binary operator over the cross product of its operands.
    ///
    /// Unless every match is marked evaluate-together, each match is fed to
    /// both operands on its own. Within a run, every left result is paired
    /// with every right result, left outer and right inner. With
    /// `calc_when_empty`, an empty side is passed as `None` instead of
    /// producing nothing.
    pub fn cross<F>(
        &mut self,
        context: &Context,
        expr: &ExpressionNode,
        calc_when_empty: bool,
        mut calc: F,
    ) -> Result<Context, EvalError>
    where
        F: FnMut(
            &mut Evaluator,
            &Context,
            Option<NodeId>,
            Option<NodeId>,
        ) -> Result<Option<NodeId>, EvalError>,
    {
        if self.all_together(context) {
            let results = self.cross_once(context, expr, calc_when_empty, &mut calc)?;
            return Ok(context.child(results));
        }

        let mut results = Vec::new();
        for id in context.matches.clone() {
            let single = context.single_child(id);
            results.extend(self.cross_once(&single, expr, calc_when_empty, &mut calc)?);
        }
        Ok(context.child(results))
    }

    fn cross_once<F>(
        &mut self,
        context: &Context,
        expr: &ExpressionNode,
        calc_when_empty: bool,
        calc: &mut F,
    ) -> Result<Vec<NodeId>, EvalError>
    where
        F: FnMut(
            &mut Evaluator,
            &Context,
            Option<NodeId>,
            Option<NodeId>,
        ) -> Result<Option<NodeId>, EvalError>,
    {
        let lhs = self.eval(context, expr.lhs())?.matches;
        let mut lefts: Vec<Option<NodeId>> = lhs.into_iter().map(Some).collect();
        if lefts.is_empty() {
            if !calc_when_empty {
                return Ok(Vec::new());
            }
            lefts.push(None);
        }

        let rhs = self.eval(context, expr.rhs())?.matches;
        let mut rights: Vec<Option<NodeId>> = rhs.into_iter().map(Some).collect();
        if rights.is_empty() && calc_when_empty {
            rights.push(None);
        }

        let mut results = Vec::new();
        for left in &lefts {
            for right in &rights {
                if let Some(result) = calc(self, context, *left, *right)? {
                    results.push(result);
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn values(evaluator: &Evaluator, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| evaluator.arena().get(*id).value.clone())
            .collect()
    }

    #[test]
    fn test_identity_returns_inputs() {
        let mut evaluator = Evaluator::new(Config::default());
        let one = evaluator.arena_mut().new_int(1);
        let expr = parse_expression("").unwrap();
        assert_eq!(evaluator.evaluate(&expr, &[one]).unwrap(), vec![one]);
    }

    #[test]
    fn test_cross_product_order() {
        let mut evaluator = Evaluator::new(Config::default());
        let null = evaluator.arena_mut().new_null();
        let expr = parse_expression("(1, 2) + (10, 20)").unwrap();
        let results = evaluator.evaluate(&expr, &[null]).unwrap();
        assert_eq!(values(&evaluator, &results), vec!["11", "12", "21", "22"]);
    }

    #[test]
    fn test_truthiness() {
        let mut evaluator = Evaluator::new(Config::default());
        let arena = evaluator.arena_mut();
        let null = arena.new_null();
        let no = arena.new_bool(false);
        let zero = arena.new_int(0);
        let empty = arena.new_str("");
        assert!(!evaluator.truthy(null));
        assert!(!evaluator.truthy(no));
        assert!(evaluator.truthy(zero));
        assert!(evaluator.truthy(empty));
    }

    #[test]
    fn test_syntax_error_converts() {
        let err: EvalError = parse_expression("[1").unwrap_err().into();
        assert!(matches!(err, EvalError::Syntax(ParseError::MissingBracket(']'))));
    }
}
