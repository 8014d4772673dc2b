use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};

use super::{block_parts, first_result, groups};

/// `lhs = rhs` and `lhs |= rhs`.
///
/// Plain assignment evaluates the right side once, read-only, against the
/// input and copies its first result onto every left match. Update
/// assignment evaluates the right side against each left match in turn.
/// Either way the result is the input, now modified.
pub fn assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = expr.operation.prefs.assign();

    for group in groups(evaluator, context) {
        if expr.operation.update_assign {
            let targets = evaluator.eval_writable(&group, expr.lhs())?.matches;
            for target in targets {
                let Some(value) = evaluator.eval_single(&group, target, expr.rhs())?.first() else {
                    continue;
                };
                let arena = evaluator.arena_mut();
                if prefs.only_write_null && !arena.get(target).is_null() {
                    continue;
                }
                arena.update_from(target, value, &prefs);
            }
            continue;
        }

        let value = first_result(evaluator, &group, expr.rhs())?;
        let targets = evaluator.eval_writable(&group, expr.lhs())?.matches;
        let Some(value) = value else {
            continue;
        };
        let arena = evaluator.arena_mut();
        for target in targets {
            if prefs.only_write_null && !arena.get(target).is_null() {
                continue;
            }
            arena.update_from(target, value, &prefs);
        }
    }
    Ok(context.clone())
}

/// `with(path; updates)`: runs `updates` against each node `path` selects.
pub fn with(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (path, updates) = block_parts(expr.rhs());
    if updates.is_none() {
        return Err(EvalError::ArityError(
            "with expects two arguments: with(path; updates)".to_string(),
        ));
    }
    let targets = evaluator.eval_writable(context, path)?.matches;
    for target in targets {
        evaluator.eval_single(context, target, updates)?;
    }
    Ok(context.clone())
}
