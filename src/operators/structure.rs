use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::ASSIGN_VARIABLE;
use crate::ast::preferences::Prefs;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::NodeId;

use super::variables;

pub fn self_reference(
    _evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    Ok(context.clone())
}

/// `a | b`. When `a` is a binding (`src as $x`), `b` runs once per bound value.
pub fn pipe(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    if let Some(binding) = expr.lhs().filter(|lhs| lhs.is(&ASSIGN_VARIABLE)) {
        return variables::variable_loop(evaluator, context, binding, expr.rhs());
    }
    let lhs = evaluator.eval(context, expr.lhs())?;
    evaluator.eval(&lhs, expr.rhs())
}

/// The tight pipe joining path segments and feeding bracket contents into
/// their collector. Each match is piped on its own.
pub fn short_pipe(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    if context.is_empty() || evaluator.all_together(context) {
        let lhs = evaluator.eval(context, expr.lhs())?;
        return evaluator.eval(&lhs, expr.rhs());
    }

    let mut results = Vec::new();
    for id in &context.matches {
        let lhs = evaluator.eval_single(context, *id, expr.lhs())?;
        results.extend(evaluator.eval(&lhs, expr.rhs())?.matches);
    }
    Ok(context.child(results))
}

pub fn union(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = evaluator.eval(context, expr.lhs())?.matches;
    results.extend(evaluator.eval(context, expr.rhs())?.matches);
    Ok(context.child(results))
}

pub fn block(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    evaluator.eval(context, expr.rhs())
}

pub fn empty(
    _evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    Ok(context.child(Vec::new()))
}

/// A literal: one fresh node per match, or a single node for an empty stream.
pub fn value(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (tag, text) = match &expr.operation.prefs {
        Prefs::Value(literal) => (literal.tag.clone(), literal.value.clone()),
        _ => (String::new(), expr.operation.string_value.clone()),
    };

    let arena = evaluator.arena_mut();
    let mut make = |source: Option<NodeId>| {
        let id = arena.new_scalar(&tag, text.clone());
        if let Some(source) = source {
            let (document_index, file_index, filename) = {
                let node = arena.get(source);
                (node.document_index, node.file_index, node.filename.clone())
            };
            let node = arena.get_mut(id);
            node.document_index = document_index;
            node.file_index = file_index;
            node.filename = filename;
        }
        id
    };

    if context.is_empty() {
        return Ok(context.child(vec![make(None)]));
    }
    let results = context.matches.iter().map(|id| make(Some(*id))).collect();
    Ok(context.child(results))
}
