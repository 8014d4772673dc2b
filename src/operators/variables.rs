use log::debug;

use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::{ASSIGN_VARIABLE, BLOCK, GET_VARIABLE};
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::NodeId;

use super::groups;

fn variable_name(binding: &ExpressionNode) -> Result<&str, EvalError> {
    match binding.rhs() {
        Some(rhs) if rhs.is(&GET_VARIABLE) => Ok(&rhs.operation.string_value),
        _ => Err(EvalError::TypeError(
            "'as' must be followed by a variable name".to_string(),
        )),
    }
}

fn bind(evaluator: &mut Evaluator, value: NodeId, is_reference: bool) -> NodeId {
    if is_reference {
        value
    } else {
        evaluator.arena_mut().deep_copy(value)
    }
}

/// `src as $x | body`: body runs once per value of `src` with `$x` bound to
/// it. With no values the body still runs once, unbound.
pub(crate) fn variable_loop(
    evaluator: &mut Evaluator,
    context: &Context,
    binding: &ExpressionNode,
    body: Option<&ExpressionNode>,
) -> Result<Context, EvalError> {
    let name = variable_name(binding)?.to_string();
    let is_reference = binding.operation.prefs.variable().is_reference;
    let values = evaluator.eval_readonly(context, binding.lhs())?.matches;
    if values.is_empty() {
        return evaluator.eval(context, body);
    }

    let mut results = Vec::new();
    for value in values {
        let bound = bind(evaluator, value, is_reference);
        let mut scoped = context.clone();
        scoped.set_variable(name.clone(), vec![bound]);
        results.extend(evaluator.eval(&scoped, body)?.matches);
    }
    Ok(context.child(results))
}

/// `src as $x` on its own binds every value of `src` at once.
pub fn assign_variable(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let name = variable_name(expr)?.to_string();
    let is_reference = expr.operation.prefs.variable().is_reference;
    let values = evaluator.eval_readonly(context, expr.lhs())?.matches;
    let bound = values
        .into_iter()
        .map(|value| bind(evaluator, value, is_reference))
        .collect();
    let mut scoped = context.clone();
    scoped.set_variable(name, bound);
    Ok(scoped)
}

pub fn get_variable(
    _evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let name = &expr.operation.string_value;
    let values = match context.variable(name) {
        Some(values) => values.clone(),
        None => {
            debug!("variable ${} is not defined", name);
            Vec::new()
        }
    };
    Ok(context.child(values))
}

/// Splits `reduce`/`foreach` operands into the binding and the
/// `(init; update)` pair.
fn fold_parts(
    expr: &ExpressionNode,
) -> Result<(&ExpressionNode, Option<&ExpressionNode>, Option<&ExpressionNode>), EvalError> {
    let binding = expr
        .lhs()
        .filter(|lhs| lhs.is(&ASSIGN_VARIABLE))
        .ok_or_else(|| {
            EvalError::TypeError(format!(
                "{} expects 'source as $name'",
                expr.name().to_lowercase()
            ))
        })?;
    let block = expr.rhs().filter(|rhs| rhs.is(&BLOCK)).ok_or_else(|| {
        EvalError::ArityError(format!("{} expects (init; update)", expr.name().to_lowercase()))
    })?;
    Ok((binding, block.lhs(), block.rhs()))
}

fn fold(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    emit_each: bool,
) -> Result<Context, EvalError> {
    let (binding, init, update) = fold_parts(expr)?;
    let name = variable_name(binding)?.to_string();
    let is_reference = binding.operation.prefs.variable().is_reference;

    let mut results = Vec::new();
    for group in groups(evaluator, context) {
        let items = evaluator.eval_readonly(&group, binding.lhs())?.matches;
        let mut accumulator = evaluator.eval(&group, init)?;
        for item in items {
            let bound = bind(evaluator, item, is_reference);
            let mut scoped = accumulator.clone();
            scoped.set_variable(name.clone(), vec![bound]);
            accumulator = evaluator.eval(&scoped, update)?;
            if emit_each {
                results.extend(accumulator.matches.iter().copied());
            }
        }
        if !emit_each {
            results.extend(accumulator.matches);
        }
    }
    Ok(context.child(results))
}

/// `reduce src as $x (init; update)`
pub fn reduce(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    fold(evaluator, context, expr, false)
}

/// `foreach src as $x (init; update)`: like reduce, emitting every
/// intermediate state.
pub fn foreach(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    fold(evaluator, context, expr, true)
}
