//! Operator handlers.
//!
//! One module per operator family. Every handler has the same shape,
//! `fn(&mut Evaluator, &Context, &ExpressionNode) -> Result<Context, EvalError>`,
//! and is wired to its descriptor in [`crate::ast::operators`].

pub mod arithmetic;
pub mod assign;
pub mod boolean;
pub mod collect;
pub mod collections;
pub mod comments;
pub mod compare;
pub mod datetime;
pub mod encode;
pub mod metadata;
pub mod multiply;
pub mod navigation;
pub mod paths;
pub mod select;
pub mod sort;
pub mod strings;
pub mod structure;
pub mod system;
pub mod variables;

use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::BLOCK;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, TAG_INT};
use crate::value;

/// Splits a context into the units binary operators work on: the whole
/// stream in evaluate-together mode, otherwise one context per match.
pub(crate) fn groups(evaluator: &Evaluator, context: &Context) -> Vec<Context> {
    if evaluator.all_together(context) {
        return vec![context.clone()];
    }
    context
        .matches
        .iter()
        .map(|id| context.single_child(*id))
        .collect()
}

/// First result of `expr` evaluated read-only against `context`.
pub(crate) fn first_result(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: Option<&ExpressionNode>,
) -> Result<Option<NodeId>, EvalError> {
    Ok(evaluator.eval_readonly(context, expr)?.first())
}

/// Text of the first result of an argument expression, evaluated against `id`.
pub(crate) fn string_arg(
    evaluator: &mut Evaluator,
    context: &Context,
    id: NodeId,
    expr: Option<&ExpressionNode>,
    operator: &str,
) -> Result<String, EvalError> {
    let result = evaluator.eval_single_readonly(context, id, expr)?.first();
    match result {
        Some(arg) => Ok(evaluator.arena().get(arg).value.clone()),
        None => Err(EvalError::ArityError(format!(
            "{} expects an argument but it produced no result",
            operator
        ))),
    }
}

pub(crate) fn int_arg(
    evaluator: &mut Evaluator,
    context: &Context,
    id: NodeId,
    expr: Option<&ExpressionNode>,
    operator: &str,
) -> Result<i64, EvalError> {
    let text = string_arg(evaluator, context, id, expr, operator)?;
    value::parse_int(&text)
        .map(|(_, n)| n)
        .ok_or_else(|| {
            EvalError::TypeError(format!("{} expects an integer, got '{}'", operator, text))
        })
}

/// `a; b` arguments: the two halves of a BLOCK, or the expression alone.
pub(crate) fn block_parts(
    expr: Option<&ExpressionNode>,
) -> (Option<&ExpressionNode>, Option<&ExpressionNode>) {
    match expr {
        Some(node) if node.is(&BLOCK) => (node.lhs(), node.rhs()),
        other => (other, None),
    }
}

/// `tag (path)`, the way nodes are named in error messages.
pub(crate) fn describe(arena: &Arena, id: NodeId) -> String {
    let node = arena.get(id);
    let tag = if node.tag.is_empty() {
        node.kind.name()
    } else {
        node.tag.as_str()
    };
    format!("{} ({})", tag, arena.nice_path(id))
}

pub(crate) fn expect_sequence(
    arena: &Arena,
    id: NodeId,
    operator: &str,
) -> Result<NodeId, EvalError> {
    let target = arena.resolve_alias(id);
    if arena.get(target).kind != Kind::Sequence {
        return Err(EvalError::TypeError(format!(
            "{} only works on sequences, got {}",
            operator,
            describe(arena, id)
        )));
    }
    Ok(target)
}

/// New sequence holding deep copies of `items`.
pub(crate) fn sequence_of(arena: &mut Arena, items: &[NodeId]) -> NodeId {
    let seq = arena.new_sequence();
    for item in items {
        let copy = arena.deep_copy(*item);
        arena.push_child(seq, copy);
    }
    seq
}

/// Path element as a node: keys become strings and indices become ints.
pub(crate) fn path_element_node(arena: &mut Arena, element: &crate::node::PathElement) -> NodeId {
    match element {
        crate::node::PathElement::Key(key) => arena.new_str(key.clone()),
        crate::node::PathElement::Index(index) => arena.new_scalar(TAG_INT, index.to_string()),
    }
}
