use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::FLATTEN_BY;
use crate::ast::preferences::AssignPrefs;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, PathElement, TAG_INT, TAG_NULL};
use crate::traverse;

use super::arithmetic::add_nodes;
use super::{describe, expect_sequence, first_result, int_arg, path_element_node};

pub fn length(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let node = arena.get(arena.resolve_alias(*id));
        let length = match node.kind {
            Kind::Mapping => node.content.len() / 2,
            Kind::Sequence => node.content.len(),
            Kind::Scalar if node.tag == TAG_NULL => 0,
            _ => node.value.chars().count(),
        };
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_INT, length.to_string()));
    }
    Ok(context.child(results))
}

/// Map keys, or sequence indices. Scalars have no keys.
pub fn keys(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        let seq = match arena.get(target).kind {
            Kind::Mapping => {
                let seq = arena.new_sequence();
                for (key, _) in arena.entries(target) {
                    let copy = arena.deep_copy(key);
                    arena.get_mut(copy).is_map_key = false;
                    arena.push_child(seq, copy);
                }
                seq
            }
            Kind::Sequence => {
                let seq = arena.new_sequence();
                for index in 0..arena.get(target).content.len() {
                    let item = path_element_node(arena, &PathElement::Index(index));
                    arena.push_child(seq, item);
                }
                seq
            }
            _ => continue,
        };
        results.push(seq);
    }
    Ok(context.child(results))
}

/// `map(f)`: `[.[] | f]`
pub fn map(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let children = traverse::splat(evaluator.arena_mut(), *id, Default::default());
        let mut mapped = Vec::new();
        for child in children {
            mapped.extend(evaluator.eval_single(context, child, expr.rhs())?.matches);
        }
        results.push(super::sequence_of(evaluator.arena_mut(), &mapped));
    }
    Ok(context.child(results))
}

/// `map_values(f)`: `.[] |= f`
pub fn map_values(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    for id in &context.matches {
        let children = traverse::splat(evaluator.arena_mut(), *id, Default::default());
        for child in children {
            if let Some(value) = evaluator.eval_single(context, child, expr.rhs())?.first() {
                evaluator
                    .arena_mut()
                    .update_from(child, value, &AssignPrefs::default());
            }
        }
    }
    Ok(context.clone())
}

fn flatten_into(arena: &mut Arena, seq: NodeId, depth: Option<i64>, out: NodeId) {
    for child in arena.get(seq).content.clone() {
        let target = arena.resolve_alias(child);
        let deeper = depth.is_none_or(|d| d > 0);
        if arena.get(target).kind == Kind::Sequence && deeper {
            flatten_into(arena, target, depth.map(|d| d - 1), out);
        } else {
            let copy = arena.deep_copy(child);
            arena.push_child(out, copy);
        }
    }
}

/// `flatten` and `flatten(depth)`
pub fn flatten(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let depth = if expr.is(&FLATTEN_BY) {
            let depth = int_arg(evaluator, context, *id, expr.rhs(), "flatten")?;
            if depth < 0 {
                return Err(EvalError::TypeError("flatten depth must not be negative".to_string()));
            }
            Some(depth)
        } else {
            None
        };
        let arena = evaluator.arena_mut();
        let seq = expect_sequence(arena, *id, "flatten")?;
        let out = arena.copy_without_content(seq);
        flatten_into(arena, seq, depth, out);
        results.push(out);
    }
    Ok(context.child(results))
}

/// `add`: folds `+` over the elements; an empty sequence adds up to null.
pub fn add_elements(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let seq = expect_sequence(arena, *id, "add")?;
        let mut total = arena.new_null();
        for element in arena.get(seq).content.clone() {
            total = add_nodes(arena, total, element)?;
        }
        results.push(total);
    }
    Ok(context.child(results))
}

fn entry(arena: &mut Arena, key: NodeId, value: NodeId) -> NodeId {
    let map = arena.new_mapping();
    let key_name = arena.new_str("key");
    let key_copy = arena.deep_copy(key);
    arena.get_mut(key_copy).is_map_key = false;
    arena.push_entry(map, key_name, key_copy);
    let value_name = arena.new_str("value");
    let value_copy = arena.deep_copy(value);
    arena.push_entry(map, value_name, value_copy);
    map
}

fn to_entries_of(arena: &mut Arena, id: NodeId) -> Result<NodeId, EvalError> {
    let target = arena.resolve_alias(id);
    let seq = arena.new_sequence();
    match arena.get(target).kind {
        Kind::Mapping => {
            for (key, value) in arena.entries(target) {
                let item = entry(arena, key, value);
                arena.push_child(seq, item);
            }
        }
        Kind::Sequence => {
            for (index, value) in arena.get(target).content.clone().into_iter().enumerate() {
                let key = path_element_node(arena, &PathElement::Index(index));
                let item = entry(arena, key, value);
                arena.push_child(seq, item);
            }
        }
        _ => {
            return Err(EvalError::TypeError(format!(
                "to_entries needs a map or a sequence, got {}",
                describe(arena, id)
            )));
        }
    }
    Ok(seq)
}

const KEY_NAMES: [&str; 6] = ["key", "k", "name", "Name", "Key", "K"];
const VALUE_NAMES: [&str; 4] = ["value", "v", "Value", "V"];

fn from_entries_of(arena: &mut Arena, id: NodeId) -> Result<NodeId, EvalError> {
    let seq = expect_sequence(arena, id, "from_entries")?;
    let map = arena.new_mapping();
    for item in arena.get(seq).content.clone() {
        let item = arena.resolve_alias(item);
        if arena.get(item).kind != Kind::Mapping {
            return Err(EvalError::TypeError(format!(
                "from_entries needs maps with a key and a value, got {}",
                describe(arena, item)
            )));
        }
        let key = KEY_NAMES.iter().find_map(|name| arena.map_value(item, name));
        let value = VALUE_NAMES.iter().find_map(|name| arena.map_value(item, name));
        let key = match key {
            Some(key) => arena.deep_copy(key),
            None => arena.new_null(),
        };
        let value = match value {
            Some(value) => arena.deep_copy(value),
            None => arena.new_null(),
        };
        arena.push_entry(map, key, value);
    }
    Ok(map)
}

pub fn to_entries(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        results.push(to_entries_of(evaluator.arena_mut(), *id)?);
    }
    Ok(context.child(results))
}

pub fn from_entries(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        results.push(from_entries_of(evaluator.arena_mut(), *id)?);
    }
    Ok(context.child(results))
}

/// `with_entries(f)`: `to_entries | map(f) | from_entries`
pub fn with_entries(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let entries = to_entries_of(evaluator.arena_mut(), *id)?;
        let mapped = evaluator.arena_mut().new_sequence();
        for item in evaluator.arena().get(entries).content.clone() {
            for result in evaluator.eval_single(context, item, expr.rhs())?.matches {
                let copy = evaluator.arena_mut().deep_copy(result);
                evaluator.arena_mut().push_child(mapped, copy);
            }
        }
        results.push(from_entries_of(evaluator.arena_mut(), mapped)?);
    }
    Ok(context.child(results))
}

/// Keys named by the argument sequence of `pick`/`omit`.
fn selection(
    evaluator: &mut Evaluator,
    context: &Context,
    id: NodeId,
    expr: &ExpressionNode,
    operator: &str,
) -> Result<Vec<NodeId>, EvalError> {
    let single = context.single_child(id);
    let Some(list) = first_result(evaluator, &single, expr.rhs())? else {
        return Ok(Vec::new());
    };
    let seq = expect_sequence(evaluator.arena(), list, operator)?;
    Ok(evaluator.arena().get(seq).content.clone())
}

fn index_of(arena: &Arena, key: NodeId, len: usize) -> Option<usize> {
    let (_, n) = crate::value::parse_int(&arena.get(key).value)?;
    let position = if n < 0 { len as i64 + n } else { n };
    (0..len as i64).contains(&position).then_some(position as usize)
}

/// `pick(keys)`: keeps the listed keys or indices, in the order listed.
pub fn pick(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let wanted = selection(evaluator, context, *id, expr, "pick")?;
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        let result = arena.copy_without_content(target);
        match arena.get(target).kind {
            Kind::Mapping => {
                for key in wanted {
                    let name = arena.get(key).value.clone();
                    let Some((k, v)) = arena
                        .entries(target)
                        .into_iter()
                        .find(|(k, _)| arena.get(*k).value == name)
                    else {
                        continue;
                    };
                    let (k, v) = (arena.deep_copy(k), arena.deep_copy(v));
                    arena.push_entry(result, k, v);
                }
            }
            Kind::Sequence => {
                let content = arena.get(target).content.clone();
                for key in wanted {
                    if let Some(position) = index_of(arena, key, content.len()) {
                        let copy = arena.deep_copy(content[position]);
                        arena.push_child(result, copy);
                    }
                }
            }
            _ => {
                return Err(EvalError::TypeError(format!(
                    "pick needs a map or a sequence, got {}",
                    describe(arena, *id)
                )));
            }
        }
        results.push(result);
    }
    Ok(context.child(results))
}

/// `omit(keys)`: drops the listed keys or indices, keeping document order.
pub fn omit(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let unwanted = selection(evaluator, context, *id, expr, "omit")?;
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        let result = arena.copy_without_content(target);
        match arena.get(target).kind {
            Kind::Mapping => {
                let names: Vec<String> =
                    unwanted.iter().map(|k| arena.get(*k).value.clone()).collect();
                for (k, v) in arena.entries(target) {
                    if names.contains(&arena.get(k).value) {
                        continue;
                    }
                    let (k, v) = (arena.deep_copy(k), arena.deep_copy(v));
                    arena.push_entry(result, k, v);
                }
            }
            Kind::Sequence => {
                let content = arena.get(target).content.clone();
                let skipped: Vec<usize> = unwanted
                    .iter()
                    .filter_map(|k| index_of(arena, *k, content.len()))
                    .collect();
                for (position, child) in content.into_iter().enumerate() {
                    if skipped.contains(&position) {
                        continue;
                    }
                    let copy = arena.deep_copy(child);
                    arena.push_child(result, copy);
                }
            }
            _ => {
                return Err(EvalError::TypeError(format!(
                    "omit needs a map or a sequence, got {}",
                    describe(arena, *id)
                )));
            }
        }
        results.push(result);
    }
    Ok(context.child(results))
}
