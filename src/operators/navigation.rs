use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::{COLLECT, SHORT_PIPE};
use crate::ast::preferences::{Prefs, RecursiveDescentPrefs};
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::traverse;

use super::groups;

/// `.key`
pub fn traverse_path(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = expr.operation.prefs.traverse();
    let key = &expr.operation.string_value;
    let mut results = Vec::new();
    for id in &context.matches {
        results.extend(traverse::traverse_key(
            evaluator.arena_mut(),
            context,
            *id,
            key,
            prefs,
        )?);
    }
    Ok(context.child(results))
}

/// `lhs[indices]`. The right side is the collected bracket contents; an
/// empty bracket splats.
pub fn traverse_array(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut prefs = expr.operation.prefs.traverse();
    let collector = expr
        .rhs()
        .filter(|rhs| rhs.is(&SHORT_PIPE))
        .and_then(|rhs| rhs.rhs())
        .filter(|node| node.is(&COLLECT));
    if let Some(collector) = collector {
        prefs.optional |= collector.operation.prefs.traverse().optional;
    }

    let mut results = Vec::new();
    for group in groups(evaluator, context) {
        let indices = match evaluator.eval_readonly(&group, expr.rhs())?.first() {
            Some(seq) => evaluator.arena().get(seq).content.clone(),
            None => Vec::new(),
        };
        let lhs = evaluator.eval(&group, expr.lhs())?;
        for id in &lhs.matches {
            results.extend(traverse::traverse_indices(
                evaluator.arena_mut(),
                &lhs,
                *id,
                &indices,
                prefs,
            )?);
        }
    }
    Ok(context.child(results))
}

/// `..` and `...`
pub fn recursive_descent(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = match &expr.operation.prefs {
        Prefs::RecursiveDescent(prefs) => *prefs,
        _ => RecursiveDescentPrefs {
            recurse_array: true,
            ..RecursiveDescentPrefs::default()
        },
    };
    let mut results = Vec::new();
    for id in &context.matches {
        traverse::recursive_descent(evaluator.arena_mut(), *id, prefs, &mut results);
    }
    Ok(context.child(results))
}
