//! `+`, `-`, `/`, `%` and their compound assignments.

use rust_decimal::Decimal;

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, PathElement, TAG_FLOAT, TAG_INT, TAG_STR};
use crate::value;

use super::{describe, first_result, groups};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl NumericOp {
    fn ints(self, a: i64, b: i64) -> Option<i64> {
        match self {
            NumericOp::Add => a.checked_add(b),
            NumericOp::Subtract => a.checked_sub(b),
            NumericOp::Multiply => a.checked_mul(b),
            NumericOp::Divide if a.checked_rem(b) == Some(0) => a.checked_div(b),
            NumericOp::Divide => None,
            NumericOp::Modulo => a.checked_rem(b),
        }
    }

    fn decimals(self, a: Decimal, b: Decimal) -> Option<Decimal> {
        match self {
            NumericOp::Add => a.checked_add(b),
            NumericOp::Subtract => a.checked_sub(b),
            NumericOp::Multiply => a.checked_mul(b),
            NumericOp::Divide => a
                .checked_div(b)
                .filter(|quotient| quotient.checked_mul(b) == Some(a)),
            NumericOp::Modulo => a.checked_rem(b),
        }
    }

    fn floats(self, a: f64, b: f64) -> f64 {
        match self {
            NumericOp::Add => a + b,
            NumericOp::Subtract => a - b,
            NumericOp::Multiply => a * b,
            NumericOp::Divide => a / b,
            NumericOp::Modulo => a % b,
        }
    }

    fn divides(self) -> bool {
        matches!(self, NumericOp::Divide | NumericOp::Modulo)
    }
}

/// Scalar result standing in for `lhs`. A custom tag on the left survives.
pub(crate) fn scalar_result(arena: &mut Arena, lhs: NodeId, tag: &str, text: String) -> NodeId {
    let result = arena.copy_without_content(lhs);
    let node = arena.get_mut(result);
    let custom = node.tag.starts_with('!') && !node.tag.starts_with("!!");
    if !custom {
        node.tag = tag.to_string();
    }
    node.kind = Kind::Scalar;
    node.value = text;
    node.anchor.clear();
    result
}

/// Applies `op` to two numeric scalars. `Ok(None)` when either side is not
/// a number.
///
/// Two ints stay an int in the left operand's notation. Anything else goes
/// through exact decimal arithmetic, falling back to `f64` when the decimal
/// result is not exact or the operands have no decimal view.
pub(crate) fn numeric(
    arena: &mut Arena,
    lhs: NodeId,
    rhs: NodeId,
    op: NumericOp,
) -> Result<Option<NodeId>, EvalError> {
    let (left_tag, left_text) = {
        let node = arena.get(lhs);
        (node.effective_tag().to_string(), node.value.clone())
    };
    let (right_tag, right_text) = {
        let node = arena.get(rhs);
        (node.effective_tag().to_string(), node.value.clone())
    };
    let is_number = |tag: &str| tag == TAG_INT || tag == TAG_FLOAT;
    if !is_number(&left_tag) || !is_number(&right_tag) {
        return Ok(None);
    }

    if left_tag == TAG_INT && right_tag == TAG_INT {
        if let (Some((format, a)), Some((_, b))) =
            (value::parse_int(&left_text), value::parse_int(&right_text))
        {
            if b == 0 && op.divides() {
                return Err(EvalError::DivisionByZero(format!(
                    "{} ({}) by 0",
                    left_text,
                    arena.nice_path(lhs)
                )));
            }
            if let Some(n) = op.ints(a, b) {
                let text = value::format_int(format, n);
                return Ok(Some(scalar_result(arena, lhs, TAG_INT, text)));
            }
        }
    }

    if let (Some(a), Some(b)) = (value::to_decimal(&left_text), value::to_decimal(&right_text)) {
        if !(b.is_zero() && op.divides()) {
            if let Some(d) = op.decimals(a, b) {
                let text = value::format_decimal(d);
                return Ok(Some(scalar_result(arena, lhs, TAG_FLOAT, text)));
            }
        }
    }

    let a = value::parse_float(&left_text).unwrap_or(f64::NAN);
    let b = value::parse_float(&right_text).unwrap_or(f64::NAN);
    let text = value::format_float(op.floats(a, b));
    Ok(Some(scalar_result(arena, lhs, TAG_FLOAT, text)))
}

fn add_maps(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> NodeId {
    let result = arena.deep_copy(lhs);
    for (key, value) in arena.entries(rhs) {
        let name = arena.get(key).value.clone();
        let value_copy = arena.deep_copy(value);
        let existing = arena
            .get(result)
            .content
            .chunks_exact(2)
            .position(|pair| arena.get(pair[0]).value == name);
        match existing {
            Some(pair) => {
                arena.get_mut(result).content[pair * 2 + 1] = value_copy;
                arena.set_parent(value_copy, result, PathElement::Key(name));
            }
            None => {
                let key_copy = arena.deep_copy(key);
                arena.push_entry(result, key_copy, value_copy);
            }
        }
    }
    result
}

pub(crate) fn add_nodes(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
    let left = arena.resolve_alias(lhs);
    let right = arena.resolve_alias(rhs);
    if arena.get(left).is_null() {
        return Ok(arena.deep_copy(right));
    }
    if arena.get(right).is_null() {
        return Ok(arena.deep_copy(left));
    }

    match (arena.get(left).kind, arena.get(right).kind) {
        (Kind::Mapping, Kind::Mapping) => Ok(add_maps(arena, left, right)),
        (Kind::Sequence, Kind::Sequence) => {
            let result = arena.deep_copy(left);
            for child in arena.get(right).content.clone() {
                let copy = arena.deep_copy(child);
                arena.push_child(result, copy);
            }
            Ok(result)
        }
        (Kind::Sequence, Kind::Scalar) => {
            let result = arena.deep_copy(left);
            let copy = arena.deep_copy(right);
            arena.push_child(result, copy);
            Ok(result)
        }
        (Kind::Scalar, Kind::Scalar) => {
            let left_tag = arena.get(left).effective_tag().to_string();
            let right_tag = arena.get(right).effective_tag().to_string();
            if left_tag == TAG_STR || right_tag == TAG_STR {
                let text = format!("{}{}", arena.get(left).value, arena.get(right).value);
                return Ok(scalar_result(arena, left, TAG_STR, text));
            }
            numeric(arena, left, right, NumericOp::Add)?
                .ok_or_else(|| cannot(arena, right, "added to", left))
        }
        _ => Err(cannot(arena, right, "added to", left)),
    }
}

fn subtract_nodes(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
    let left = arena.resolve_alias(lhs);
    let right = arena.resolve_alias(rhs);
    match (arena.get(left).kind, arena.get(right).kind) {
        (Kind::Sequence, Kind::Sequence) => {
            let removed = arena.get(right).content.clone();
            let result = arena.copy_without_content(left);
            for child in arena.get(left).content.clone() {
                if removed.iter().any(|r| value::deep_equal(arena, child, *r)) {
                    continue;
                }
                let copy = arena.deep_copy(child);
                arena.push_child(result, copy);
            }
            Ok(result)
        }
        (Kind::Scalar, Kind::Scalar) => numeric(arena, left, right, NumericOp::Subtract)?
            .ok_or_else(|| cannot(arena, right, "subtracted from", left)),
        _ => Err(cannot(arena, right, "subtracted from", left)),
    }
}

fn divide_nodes(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
    let left = arena.resolve_alias(lhs);
    let right = arena.resolve_alias(rhs);
    let both_strings = arena.get(left).kind == Kind::Scalar
        && arena.get(left).effective_tag() == TAG_STR
        && arena.get(right).effective_tag() == TAG_STR;
    if both_strings {
        let text = arena.get(left).value.clone();
        let separator = arena.get(right).value.clone();
        let seq = arena.new_sequence();
        for part in text.split(separator.as_str()) {
            let item = arena.new_str(part);
            arena.push_child(seq, item);
        }
        return Ok(seq);
    }
    if arena.get(left).kind != Kind::Scalar || arena.get(right).kind != Kind::Scalar {
        return Err(cannot(arena, left, "divided by", right));
    }
    numeric(arena, left, right, NumericOp::Divide)?
        .ok_or_else(|| cannot(arena, left, "divided by", right))
}

fn modulo_nodes(arena: &mut Arena, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
    let left = arena.resolve_alias(lhs);
    let right = arena.resolve_alias(rhs);
    if arena.get(left).kind != Kind::Scalar || arena.get(right).kind != Kind::Scalar {
        return Err(cannot(arena, left, "divided by", right));
    }
    numeric(arena, left, right, NumericOp::Modulo)?
        .ok_or_else(|| cannot(arena, left, "divided by", right))
}

fn cannot(arena: &Arena, subject: NodeId, verb: &str, object: NodeId) -> EvalError {
    EvalError::TypeError(format!(
        "{} cannot be {} {}",
        describe(arena, subject),
        verb,
        describe(arena, object)
    ))
}

fn binary<F>(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    calc: F,
) -> Result<Context, EvalError>
where
    F: Fn(&mut Arena, NodeId, NodeId) -> Result<NodeId, EvalError>,
{
    evaluator.cross(context, expr, false, |evaluator, _, lhs, rhs| match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => calc(evaluator.arena_mut(), lhs, rhs).map(Some),
        _ => Ok(None),
    })
}

/// `lhs op= rhs`: every lhs match is replaced by `match op rhs`, where rhs
/// is the first result of the right side against the original input.
pub(crate) fn compound_assign<F>(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    mut calc: F,
) -> Result<Context, EvalError>
where
    F: FnMut(&mut Arena, NodeId, NodeId) -> Result<NodeId, EvalError>,
{
    let prefs = expr.operation.prefs.assign();
    for group in groups(evaluator, context) {
        let Some(rhs) = first_result(evaluator, &group, expr.rhs())? else {
            continue;
        };
        let targets = evaluator.eval_writable(&group, expr.lhs())?.matches;
        for target in targets {
            let arena = evaluator.arena_mut();
            let result = calc(arena, target, rhs)?;
            arena.update_from(target, result, &prefs);
        }
    }
    Ok(context.clone())
}

pub fn add(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    binary(evaluator, context, expr, add_nodes)
}

pub fn subtract(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    binary(evaluator, context, expr, subtract_nodes)
}

pub fn divide(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    binary(evaluator, context, expr, divide_nodes)
}

pub fn modulo(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    binary(evaluator, context, expr, modulo_nodes)
}

pub fn add_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    compound_assign(evaluator, context, expr, add_nodes)
}

pub fn subtract_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    compound_assign(evaluator, context, expr, subtract_nodes)
}

pub fn divide_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    compound_assign(evaluator, context, expr, divide_nodes)
}

pub fn modulo_assign(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    compound_assign(evaluator, context, expr, modulo_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TAG_INT;

    fn scalar_value(arena: &Arena, id: NodeId) -> (String, String) {
        let node = arena.get(id);
        (node.tag.clone(), node.value.clone())
    }

    #[test]
    fn test_int_addition_keeps_hex() {
        let mut arena = Arena::new();
        let a = arena.new_scalar(TAG_INT, "0xFF");
        let b = arena.new_int(1);
        let sum = add_nodes(&mut arena, a, b).unwrap();
        assert_eq!(scalar_value(&arena, sum), (TAG_INT.to_string(), "0x100".to_string()));
    }

    #[test]
    fn test_decimal_addition_is_exact() {
        let mut arena = Arena::new();
        let a = arena.new_scalar(TAG_FLOAT, "0.1");
        let b = arena.new_scalar(TAG_FLOAT, "0.2");
        let sum = add_nodes(&mut arena, a, b).unwrap();
        assert_eq!(arena.get(sum).value, "0.3");
    }

    #[test]
    fn test_inexact_division_uses_floats() {
        let mut arena = Arena::new();
        let a = arena.new_int(1);
        let b = arena.new_int(3);
        let quotient = divide_nodes(&mut arena, a, b).unwrap();
        assert_eq!(
            scalar_value(&arena, quotient),
            (TAG_FLOAT.to_string(), "0.3333333333333333".to_string())
        );
        let c = arena.new_scalar(TAG_FLOAT, "7.5");
        let d = arena.new_int(2);
        let exact = divide_nodes(&mut arena, c, d).unwrap();
        assert_eq!(arena.get(exact).value, "3.75");
    }

    #[test]
    fn test_null_is_additive_identity() {
        let mut arena = Arena::new();
        let null = arena.new_null();
        let s = arena.new_str("cat");
        let sum = add_nodes(&mut arena, null, s).unwrap();
        assert_eq!(arena.get(sum).value, "cat");
    }

    #[test]
    fn test_map_plus_string_is_type_error() {
        let mut arena = Arena::new();
        let map = arena.new_mapping();
        let s = arena.new_str("x");
        let err = add_nodes(&mut arena, map, s).unwrap_err();
        assert!(matches!(err, EvalError::TypeError(_)));
    }

    #[test]
    fn test_integer_division() {
        let mut arena = Arena::new();
        let seven = arena.new_int(7);
        let two = arena.new_int(2);
        let zero = arena.new_int(0);
        let half = divide_nodes(&mut arena, seven, two).unwrap();
        assert_eq!(scalar_value(&arena, half), (TAG_FLOAT.to_string(), "3.5".to_string()));
        let rem = modulo_nodes(&mut arena, seven, two).unwrap();
        assert_eq!(arena.get(rem).value, "1");
        assert!(matches!(
            divide_nodes(&mut arena, seven, zero),
            Err(EvalError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_float_division_by_zero_is_infinite() {
        let mut arena = Arena::new();
        let one = arena.new_scalar(TAG_FLOAT, "1.5");
        let zero = arena.new_int(0);
        let result = divide_nodes(&mut arena, one, zero).unwrap();
        assert_eq!(arena.get(result).value, ".inf");
    }

    #[test]
    fn test_string_division_splits() {
        let mut arena = Arena::new();
        let text = arena.new_str("a,b,c");
        let comma = arena.new_str(",");
        let parts = divide_nodes(&mut arena, text, comma).unwrap();
        assert_eq!(arena.get(parts).content.len(), 3);
    }

    #[test]
    fn test_sequence_subtraction() {
        let mut arena = Arena::new();
        let left = arena.new_sequence();
        for n in [1, 2, 3, 2] {
            let item = arena.new_int(n);
            arena.push_child(left, item);
        }
        let right = arena.new_sequence();
        let two = arena.new_int(2);
        arena.push_child(right, two);
        let result = subtract_nodes(&mut arena, left, right).unwrap();
        let values: Vec<String> = arena
            .get(result)
            .content
            .iter()
            .map(|id| arena.get(*id).value.clone())
            .collect();
        assert_eq!(values, vec!["1", "3"]);
    }
}
