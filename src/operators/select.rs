use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, PathElement, TAG_STR};
use crate::value;

use super::describe;

/// True when the first result of `condition` against `id` is truthy.
fn passes(
    evaluator: &mut Evaluator,
    context: &Context,
    id: NodeId,
    condition: Option<&ExpressionNode>,
) -> Result<bool, EvalError> {
    let result = evaluator.eval_single_readonly(context, id, condition)?.first();
    Ok(result.is_some_and(|r| evaluator.truthy(r)))
}

pub fn select(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        if passes(evaluator, context, *id, expr.rhs())? {
            results.push(*id);
        }
    }
    Ok(context.child(results))
}

pub fn has(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let wanted = evaluator.eval_single_readonly(context, *id, expr.rhs())?.first();
        let arena = evaluator.arena();
        let target = arena.resolve_alias(*id);
        let found = match wanted {
            None => false,
            Some(wanted) => {
                let key = &arena.get(wanted).value;
                match arena.get(target).kind {
                    Kind::Mapping => arena
                        .entries(target)
                        .iter()
                        .any(|(k, _)| &arena.get(*k).value == key),
                    Kind::Sequence => value::parse_int(key).is_some_and(|(_, n)| {
                        n >= 0 && (n as usize) < arena.get(target).content.len()
                    }),
                    _ => false,
                }
            }
        };
        results.push(evaluator.arena_mut().new_bool(found));
    }
    Ok(context.child(results))
}

/// Recursive containment: maps by key, sequences by element, strings by substring.
fn contains_node(arena: &Arena, haystack: NodeId, needle: NodeId) -> Result<bool, EvalError> {
    let outer = arena.resolve_alias(haystack);
    let inner = arena.resolve_alias(needle);
    let (outer_node, inner_node) = (arena.get(outer), arena.get(inner));
    match (outer_node.kind, inner_node.kind) {
        (Kind::Mapping, Kind::Mapping) => {
            for (key, wanted) in arena.entries(inner) {
                let Some(value) = arena.map_value(outer, &arena.get(key).value) else {
                    return Ok(false);
                };
                if !contains_node(arena, value, wanted)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Kind::Sequence, Kind::Sequence) => {
            for wanted in &inner_node.content {
                let mut found = false;
                for element in &outer_node.content {
                    if contains_node(arena, *element, *wanted)? {
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Kind::Scalar, Kind::Scalar) => {
            if outer_node.effective_tag() == TAG_STR && inner_node.effective_tag() == TAG_STR {
                Ok(outer_node.value.contains(inner_node.value.as_str()))
            } else {
                Ok(value::scalars_equal(outer_node, inner_node))
            }
        }
        _ => Err(EvalError::TypeError(format!(
            "{} cannot be checked for containment of {}",
            describe(arena, haystack),
            describe(arena, needle)
        ))),
    }
}

pub fn contains(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let Some(needle) = evaluator.eval_single_readonly(context, *id, expr.rhs())?.first() else {
            continue;
        };
        let found = contains_node(evaluator.arena(), *id, needle)?;
        results.push(evaluator.arena_mut().new_bool(found));
    }
    Ok(context.child(results))
}

/// Children of a collection paired with where they sit in it.
fn children(arena: &Arena, id: NodeId) -> Vec<(NodeId, PathElement)> {
    let target = arena.resolve_alias(id);
    match arena.get(target).kind {
        Kind::Sequence => arena
            .get(target)
            .content
            .iter()
            .enumerate()
            .map(|(index, child)| (*child, PathElement::Index(index)))
            .collect(),
        Kind::Mapping => arena
            .entries(target)
            .into_iter()
            .map(|(key, value)| (value, PathElement::Key(arena.get(key).value.clone())))
            .collect(),
        _ => Vec::new(),
    }
}

/// `first`: the first element of each collection. Scalars and empty
/// collections contribute nothing.
pub fn first(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let target = evaluator.arena().resolve_alias(*id);
        if let Some((child, key)) = children(evaluator.arena(), *id).into_iter().next() {
            evaluator.arena_mut().set_parent(child, target, key);
            results.push(child);
        }
    }
    Ok(context.child(results))
}

/// `first(cond)`: the first element of each collection for which `cond` holds.
pub fn first_matching(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let target = evaluator.arena().resolve_alias(*id);
        for (child, key) in children(evaluator.arena(), *id) {
            if passes(evaluator, context, child, expr.rhs())? {
                evaluator.arena_mut().set_parent(child, target, key);
                results.push(child);
                break;
            }
        }
    }
    Ok(context.child(results))
}
