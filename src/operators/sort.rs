use std::cmp::Ordering;

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId};
use crate::value::{compare_nodes, deep_equal};

use super::{describe, expect_sequence};

/// Sort keys of every element of `seq`: the results of `key` against it.
fn keyed(
    evaluator: &mut Evaluator,
    context: &Context,
    seq: NodeId,
    key: Option<&ExpressionNode>,
) -> Result<Vec<(NodeId, Vec<NodeId>)>, EvalError> {
    let elements = evaluator.arena().get(seq).content.clone();
    let mut keyed = Vec::with_capacity(elements.len());
    for element in elements {
        let keys = match key {
            Some(_) => evaluator.eval_single_readonly(context, element, key)?.matches,
            None => vec![element],
        };
        keyed.push((element, keys));
    }
    Ok(keyed)
}

fn compare_keys(arena: &Arena, a: &[NodeId], b: &[NodeId]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ordering = compare_nodes(arena, *x, *y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

fn same_keys(arena: &Arena, a: &[NodeId], b: &[NodeId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(arena, *x, *y))
}

fn is_scalar(arena: &Arena, id: NodeId) -> bool {
    arena.get(arena.resolve_alias(id)).kind == Kind::Scalar
}

fn rebuild(arena: &mut Arena, original: NodeId, elements: &[NodeId]) -> NodeId {
    let seq = arena.copy_without_content(original);
    for element in elements {
        let copy = arena.deep_copy(*element);
        arena.push_child(seq, copy);
    }
    seq
}

fn sorted(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: Option<&ExpressionNode>,
    operator: &str,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let seq = expect_sequence(evaluator.arena(), *id, operator)?;
        let mut items = keyed(evaluator, context, seq, expr)?;
        let arena = evaluator.arena_mut();
        let mut keys = items.iter().flat_map(|(_, keys)| keys);
        if let Some(key) = keys.find(|key| !is_scalar(arena, **key)) {
            return Err(EvalError::TypeError(format!(
                "{} can only sort by scalars, got {}",
                operator,
                describe(arena, *key)
            )));
        }
        items.sort_by(|(_, a), (_, b)| compare_keys(arena, a, b));
        let elements: Vec<NodeId> = items.into_iter().map(|(element, _)| element).collect();
        results.push(rebuild(arena, seq, &elements));
    }
    Ok(context.child(results))
}

pub fn sort(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    sorted(evaluator, context, None, "sort")
}

/// `sort_by(f)`: stable, so elements with equal keys keep their order.
pub fn sort_by(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    sorted(evaluator, context, expr.rhs(), "sort_by")
}

pub fn reverse(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let seq = expect_sequence(arena, *id, "reverse")?;
        let mut elements = arena.get(seq).content.clone();
        elements.reverse();
        results.push(rebuild(arena, seq, &elements));
    }
    Ok(context.child(results))
}

/// Elements grouped by key, groups in order of first appearance.
fn grouped(
    evaluator: &mut Evaluator,
    context: &Context,
    seq: NodeId,
    key: Option<&ExpressionNode>,
) -> Result<Vec<Vec<NodeId>>, EvalError> {
    let items = keyed(evaluator, context, seq, key)?;
    let arena = evaluator.arena();
    let mut groups: Vec<(Vec<NodeId>, Vec<NodeId>)> = Vec::new();
    for (element, keys) in items {
        match groups.iter_mut().find(|(k, _)| same_keys(arena, k, &keys)) {
            Some((_, members)) => members.push(element),
            None => groups.push((keys, vec![element])),
        }
    }
    Ok(groups.into_iter().map(|(_, members)| members).collect())
}

fn deduplicated(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: Option<&ExpressionNode>,
    operator: &str,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let seq = expect_sequence(evaluator.arena(), *id, operator)?;
        let firsts: Vec<NodeId> = grouped(evaluator, context, seq, expr)?
            .into_iter()
            .filter_map(|members| members.first().copied())
            .collect();
        results.push(rebuild(evaluator.arena_mut(), seq, &firsts));
    }
    Ok(context.child(results))
}

/// `unique`: first occurrence of every distinct element.
pub fn unique(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    deduplicated(evaluator, context, None, "unique")
}

pub fn unique_by(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    deduplicated(evaluator, context, expr.rhs(), "unique_by")
}

pub fn group_by(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let seq = expect_sequence(evaluator.arena(), *id, "group_by")?;
        let groups = grouped(evaluator, context, seq, expr.rhs())?;
        let arena = evaluator.arena_mut();
        let outer = arena.new_sequence();
        for members in groups {
            let group = rebuild(arena, seq, &members);
            arena.push_child(outer, group);
        }
        results.push(outer);
    }
    Ok(context.child(results))
}
