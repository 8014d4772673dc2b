use std::cmp::Ordering;

use chrono::DateTime;

use crate::ast::expressions::ExpressionNode;
use crate::ast::preferences::{ComparePrefs, Prefs};
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STR, TAG_TIMESTAMP};
use crate::traverse::key_matches;
use crate::value;

use super::{describe, expect_sequence};

/// Equality as `==` sees it. A string on the right is a glob pattern;
/// a missing operand equals only null.
fn equal(arena: &Arena, lhs: Option<NodeId>, rhs: Option<NodeId>) -> bool {
    let is_null = |id: NodeId| arena.get(arena.resolve_alias(id)).is_null();
    let (lhs, rhs) = match (lhs, rhs) {
        (None, None) => return true,
        (None, Some(r)) => return is_null(r),
        (Some(l), None) => return is_null(l),
        (Some(l), Some(r)) => (arena.resolve_alias(l), arena.resolve_alias(r)),
    };

    let left = arena.get(lhs);
    let right = arena.get(rhs);
    if left.kind == Kind::Scalar && right.kind == Kind::Scalar {
        if left.effective_tag() == TAG_STR && right.effective_tag() == TAG_STR {
            return key_matches(&right.value, &left.value, false);
        }
        return value::scalars_equal(left, right);
    }
    value::deep_equal(arena, lhs, rhs)
}

pub fn equals(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    evaluator.cross(context, expr, true, |evaluator, _, lhs, rhs| {
        let result = equal(evaluator.arena(), lhs, rhs);
        Ok(Some(evaluator.arena_mut().new_bool(result)))
    })
}

pub fn not_equals(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    evaluator.cross(context, expr, true, |evaluator, _, lhs, rhs| {
        let result = !equal(evaluator.arena(), lhs, rhs);
        Ok(Some(evaluator.arena_mut().new_bool(result)))
    })
}

fn order(arena: &Arena, layout: &str, lhs: NodeId, rhs: NodeId) -> Result<Ordering, EvalError> {
    let left = arena.get(arena.resolve_alias(lhs));
    let right = arena.get(arena.resolve_alias(rhs));
    let unsupported = || {
        EvalError::TypeError(format!(
            "{} cannot be compared with {}",
            describe(arena, lhs),
            describe(arena, rhs)
        ))
    };
    if left.kind != Kind::Scalar || right.kind != Kind::Scalar {
        return Err(unsupported());
    }

    let left_tag = left.effective_tag();
    let right_tag = right.effective_tag();
    let is_number = |tag: &str| tag == TAG_INT || tag == TAG_FLOAT;
    if is_number(left_tag) && is_number(right_tag) {
        if let (Some(a), Some(b)) =
            (value::to_decimal(&left.value), value::to_decimal(&right.value))
        {
            return Ok(a.cmp(&b));
        }
        let a = value::number_of(left).unwrap_or(f64::NAN);
        let b = value::number_of(right).unwrap_or(f64::NAN);
        return Ok(value::compare_floats(a, b));
    }
    if left_tag == TAG_TIMESTAMP || right_tag == TAG_TIMESTAMP {
        let parse = |text: &str| {
            DateTime::parse_from_str(text, layout).or_else(|_| DateTime::parse_from_rfc3339(text))
        };
        if let (Ok(a), Ok(b)) = (parse(&left.value), parse(&right.value)) {
            return Ok(a.cmp(&b));
        }
    }
    if left_tag == TAG_NULL || right_tag == TAG_NULL {
        return Ok(value::compare_nodes(arena, lhs, rhs));
    }
    if left_tag == right_tag {
        return Ok(left.value.cmp(&right.value));
    }
    Err(unsupported())
}

/// `<`, `<=`, `>`, `>=`
pub fn compare(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = match &expr.operation.prefs {
        Prefs::Compare(prefs) => *prefs,
        _ => ComparePrefs::default(),
    };
    let layout = evaluator.date_time_layout(context);
    evaluator.cross(context, expr, false, |evaluator, _, lhs, rhs| {
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Ok(None);
        };
        let ordering = order(evaluator.arena(), &layout, lhs, rhs)?;
        let result = match (prefs.greater, prefs.or_equal) {
            (true, false) => ordering == Ordering::Greater,
            (true, true) => ordering != Ordering::Less,
            (false, false) => ordering == Ordering::Less,
            (false, true) => ordering != Ordering::Greater,
        };
        Ok(Some(evaluator.arena_mut().new_bool(result)))
    })
}

fn extreme(
    evaluator: &mut Evaluator,
    context: &Context,
    wanted: Ordering,
    operator: &str,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena();
        let seq = expect_sequence(arena, *id, operator)?;
        let best = arena
            .get(seq)
            .content
            .iter()
            .copied()
            .reduce(|best, candidate| {
                if value::compare_nodes(arena, candidate, best) == wanted {
                    candidate
                } else {
                    best
                }
            });
        results.extend(best);
    }
    Ok(context.child(results))
}

pub fn min(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    extreme(evaluator, context, Ordering::Less, "min")
}

pub fn max(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    extreme(evaluator, context, Ordering::Greater, "max")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_equality() {
        let mut arena = Arena::new();
        let cat = arena.new_str("cat");
        let pattern = arena.new_str("*at");
        let other = arena.new_str("dog");
        assert!(equal(&arena, Some(cat), Some(pattern)));
        assert!(!equal(&arena, Some(other), Some(pattern)));
    }

    #[test]
    fn test_missing_equals_null_only() {
        let mut arena = Arena::new();
        let null = arena.new_null();
        let one = arena.new_int(1);
        assert!(equal(&arena, None, Some(null)));
        assert!(!equal(&arena, Some(one), None));
    }

    #[test]
    fn test_numbers_compare_across_tags() {
        let mut arena = Arena::new();
        let one = arena.new_int(1);
        let one_float = arena.new_scalar(TAG_FLOAT, "1.0");
        let two = arena.new_scalar(TAG_FLOAT, "2.5");
        assert!(equal(&arena, Some(one), Some(one_float)));
        let layout = crate::config::DEFAULT_DATE_TIME_LAYOUT;
        assert_eq!(order(&arena, layout, one, two).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_map_comparison_is_type_error() {
        let mut arena = Arena::new();
        let map = arena.new_mapping();
        let one = arena.new_int(1);
        let layout = crate::config::DEFAULT_DATE_TIME_LAYOUT;
        assert!(order(&arena, layout, map, one).is_err());
    }
}
