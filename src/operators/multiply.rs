use crate::ast::expressions::ExpressionNode;
use crate::ast::preferences::{MultiplyPrefs, Prefs};
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::merge::{self, MergeOptions};
use crate::node::{Arena, Kind, NodeId, TAG_INT, TAG_STR};
use crate::value;

use super::arithmetic::{self, NumericOp};
use super::describe;

fn multiply_prefs(expr: &ExpressionNode) -> MultiplyPrefs {
    match &expr.operation.prefs {
        Prefs::Multiply(prefs) => *prefs,
        _ => MultiplyPrefs::default(),
    }
}

/// Deep merge for collections, product for numbers, repetition for `str * int`.
pub(crate) fn multiply_nodes(
    arena: &mut Arena,
    lhs: NodeId,
    rhs: NodeId,
    prefs: &MultiplyPrefs,
) -> Result<NodeId, EvalError> {
    let left = arena.resolve_alias(lhs);
    let right = arena.resolve_alias(rhs);
    let (left_kind, left_null) = (arena.get(left).kind, arena.get(left).is_null());
    let (right_kind, right_null) = (arena.get(right).kind, arena.get(right).is_null());

    let mergeable = matches!(
        (left_kind, right_kind),
        (Kind::Mapping, Kind::Mapping) | (Kind::Sequence, Kind::Sequence)
    ) || (left_null && matches!(right_kind, Kind::Mapping | Kind::Sequence));
    if mergeable {
        let target = arena.deep_copy(left);
        return merge::merge(arena, target, right, &MergeOptions::from_prefs(prefs));
    }
    if right_null {
        return Ok(arena.deep_copy(left));
    }

    if left_kind == Kind::Scalar && right_kind == Kind::Scalar {
        let left_tag = arena.get(left).effective_tag().to_string();
        let right_tag = arena.get(right).effective_tag().to_string();
        if left_tag == TAG_STR && right_tag == TAG_INT {
            return repeat(arena, left, right);
        }
        if let Some(product) = arithmetic::numeric(arena, left, right, NumericOp::Multiply)? {
            return Ok(product);
        }
    }

    Err(EvalError::TypeError(format!(
        "cannot multiply {} with {}",
        describe(arena, left),
        describe(arena, right)
    )))
}

/// Longest string, in bytes, that `str * int` may produce.
pub const MAX_REPEAT_LEN: usize = 1 << 26;

fn repeat(arena: &mut Arena, text: NodeId, count: NodeId) -> Result<NodeId, EvalError> {
    let times = value::parse_int(&arena.get(count).value)
        .map(|(_, n)| n)
        .unwrap_or_default();
    if times <= 0 {
        return Ok(arena.new_null());
    }
    let unit = arena.get(text).value.len();
    let too_long = usize::try_from(times)
        .ok()
        .and_then(|times| unit.checked_mul(times))
        .is_none_or(|len| len > MAX_REPEAT_LEN);
    if too_long {
        return Err(EvalError::TypeError(format!(
            "cannot repeat {} {} times: the result would exceed {} bytes",
            describe(arena, text),
            times,
            MAX_REPEAT_LEN
        )));
    }
    let repeated = arena.get(text).value.repeat(times as usize);
    Ok(arithmetic::scalar_result(arena, text, TAG_STR, repeated))
}

pub fn multiply(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = multiply_prefs(expr);
    evaluator.cross(context, expr, false, |evaluator, _, lhs, rhs| match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => multiply_nodes(evaluator.arena_mut(), lhs, rhs, &prefs).map(Some),
        _ => Ok(None),
    })
}

pub fn multiply_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = multiply_prefs(expr);
    arithmetic::compound_assign(evaluator, context, expr, |arena, lhs, rhs| {
        multiply_nodes(arena, lhs, rhs, &prefs)
    })
}
