use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Kind, NodeId};

use super::{describe, first_result, groups};

#[derive(Clone, Copy)]
enum Logic {
    And,
    Or,
}

/// `and` / `or`. A side with no results counts as false. The right side is
/// only evaluated when some left value does not decide the outcome alone.
fn logic(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    logic: Logic,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for group in groups(evaluator, context) {
        let lefts = evaluator.eval_readonly(&group, expr.lhs())?.matches;
        let lefts: Vec<bool> = if lefts.is_empty() {
            vec![false]
        } else {
            lefts.iter().map(|id| evaluator.truthy(*id)).collect()
        };

        let mut rights: Option<Vec<bool>> = None;
        for left in lefts {
            let decided = match logic {
                Logic::And if !left => Some(false),
                Logic::Or if left => Some(true),
                _ => None,
            };
            if let Some(outcome) = decided {
                results.push(evaluator.arena_mut().new_bool(outcome));
                continue;
            }

            if rights.is_none() {
                let ids = evaluator.eval_readonly(&group, expr.rhs())?.matches;
                rights = Some(if ids.is_empty() {
                    vec![false]
                } else {
                    ids.iter().map(|id| evaluator.truthy(*id)).collect()
                });
            }
            for right in rights.iter().flatten() {
                results.push(evaluator.arena_mut().new_bool(*right));
            }
        }
    }
    Ok(context.child(results))
}

pub fn and(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    logic(evaluator, context, expr, Logic::And)
}

pub fn or(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    logic(evaluator, context, expr, Logic::Or)
}

pub fn not(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let results = context
        .matches
        .iter()
        .map(|id| {
            let negated = !evaluator.truthy(*id);
            evaluator.arena_mut().new_bool(negated)
        })
        .collect();
    Ok(context.child(results))
}

/// `a // b`: the truthy results of `a`, or the results of `b` if there are none.
pub fn alternative(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for group in groups(evaluator, context) {
        let lefts: Vec<NodeId> = evaluator
            .eval_readonly(&group, expr.lhs())?
            .matches
            .into_iter()
            .filter(|id| evaluator.truthy(*id))
            .collect();
        if lefts.is_empty() {
            results.extend(evaluator.eval(&group, expr.rhs())?.matches);
        } else {
            results.extend(lefts);
        }
    }
    Ok(context.child(results))
}

/// `a //= b`: replaces each falsy match of `a` with the first result of `b`.
pub fn alternative_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = expr.operation.prefs.assign();
    for group in groups(evaluator, context) {
        let targets = evaluator.eval_writable(&group, expr.lhs())?.matches;
        let mut value = None;
        for target in targets {
            if evaluator.truthy(target) {
                continue;
            }
            if value.is_none() {
                value = first_result(evaluator, &group, expr.rhs())?;
            }
            if let Some(value) = value {
                evaluator.arena_mut().update_from(target, value, &prefs);
            }
        }
    }
    Ok(context.clone())
}

fn elements(evaluator: &Evaluator, id: NodeId, operator: &str) -> Result<Vec<NodeId>, EvalError> {
    let arena = evaluator.arena();
    let target = arena.resolve_alias(id);
    match arena.get(target).kind {
        Kind::Sequence => Ok(arena.get(target).content.clone()),
        Kind::Mapping => Ok(arena.entries(target).into_iter().map(|(_, v)| v).collect()),
        _ => Err(EvalError::TypeError(format!(
            "{} only supports collections, got {}",
            operator,
            describe(arena, id)
        ))),
    }
}

fn quantify(
    evaluator: &mut Evaluator,
    context: &Context,
    condition: Option<&ExpressionNode>,
    any: bool,
) -> Result<Context, EvalError> {
    let operator = if any { "any" } else { "all" };
    let mut results = Vec::new();
    for id in &context.matches {
        let mut outcome = !any;
        for element in elements(evaluator, *id, operator)? {
            let hit = match condition {
                Some(_) => {
                    let found = evaluator
                        .eval_single_readonly(context, element, condition)?
                        .first();
                    found.is_some_and(|r| evaluator.truthy(r))
                }
                None => evaluator.truthy(element),
            };
            if hit == any {
                outcome = any;
                break;
            }
        }
        results.push(evaluator.arena_mut().new_bool(outcome));
    }
    Ok(context.child(results))
}

pub fn any(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    quantify(evaluator, context, None, true)
}

pub fn all(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    quantify(evaluator, context, None, false)
}

/// `any_c(cond)`
pub fn any_c(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    quantify(evaluator, context, expr.rhs(), true)
}

/// `all_c(cond)`
pub fn all_c(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    quantify(evaluator, context, expr.rhs(), false)
}
