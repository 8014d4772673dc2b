//! Node metadata: tags, kinds, styles, anchors, aliases and positions.

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, PathElement, Style, TAG_INT};
use crate::traverse::is_merge_key;

use super::groups;

/// Shared body of the attribute assignment operators (`tag = ...`,
/// `style |= ...`, comments). `apply` receives each target and the text of
/// the value. With `exactly_one`, a value expression producing anything
/// other than one result is an arity error.
pub(crate) fn assign_attribute<F>(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    exactly_one: bool,
    mut apply: F,
) -> Result<Context, EvalError>
where
    F: FnMut(&mut Arena, NodeId, &str) -> Result<(), EvalError>,
{
    let operator = expr.name().to_lowercase();
    let value_of = |evaluator: &mut Evaluator,
                    context: &Context|
     -> Result<Option<String>, EvalError> {
        let values = evaluator.eval_readonly(context, expr.rhs())?.matches;
        if exactly_one && values.len() != 1 {
            return Err(EvalError::ArityError(format!(
                "{} expects exactly one value, got {}",
                operator,
                values.len()
            )));
        }
        Ok(values.first().map(|id| evaluator.arena().get(*id).value.clone()))
    };

    for group in groups(evaluator, context) {
        let targets = evaluator.eval_writable(&group, expr.lhs())?.matches;
        if expr.operation.update_assign {
            for target in targets {
                let single = group.single_child(target);
                if let Some(text) = value_of(evaluator, &single)? {
                    apply(evaluator.arena_mut(), target, &text)?;
                }
            }
        } else if let Some(text) = value_of(evaluator, &group)? {
            for target in targets {
                apply(evaluator.arena_mut(), target, &text)?;
            }
        }
    }
    Ok(context.clone())
}

/// One string result per match, computed from the node.
fn read_attribute(
    evaluator: &mut Evaluator,
    context: &Context,
    tag: &str,
    read: impl Fn(&Arena, NodeId) -> String,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let text = read(arena, *id);
        results.push(arena.create_replacement(*id, Kind::Scalar, tag, text));
    }
    Ok(context.child(results))
}

fn read_str(
    evaluator: &mut Evaluator,
    context: &Context,
    read: impl Fn(&Arena, NodeId) -> String,
) -> Result<Context, EvalError> {
    read_attribute(evaluator, context, crate::node::TAG_STR, read)
}

pub fn get_tag(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| {
        let node = arena.get(id);
        match node.kind {
            Kind::Alias => arena.get(arena.resolve_alias(id)).tag.clone(),
            _ if node.tag.is_empty() => node.effective_tag().to_string(),
            _ => node.tag.clone(),
        }
    })
}

pub fn assign_tag(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    assign_attribute(evaluator, context, expr, false, |arena, target, text| {
        arena.get_mut(target).tag = text.to_string();
        Ok(())
    })
}

pub fn get_kind(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| arena.get(id).kind.name().to_string())
}

pub fn get_style(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| arena.get(id).style.name().to_string())
}

pub fn assign_style(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    assign_attribute(evaluator, context, expr, false, |arena, target, text| {
        let style = Style::from_name(text)
            .ok_or_else(|| EvalError::TypeError(format!("unknown style '{}'", text)))?;
        arena.get_mut(target).style = style;
        Ok(())
    })
}

pub fn get_anchor(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| arena.get(id).anchor.clone())
}

pub fn assign_anchor(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    assign_attribute(evaluator, context, expr, true, |arena, target, text| {
        arena.get_mut(target).anchor = text.to_string();
        Ok(())
    })
}

pub fn get_alias(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| {
        let node = arena.get(id);
        if node.kind == Kind::Alias {
            node.value.clone()
        } else {
            String::new()
        }
    })
}

/// `alias = "name"` turns each target into an alias of the node anchored
/// `name` in the same document.
pub fn assign_alias(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    assign_attribute(evaluator, context, expr, true, |arena, target, text| {
        let root = arena.root_of(target);
        let anchored = arena.find_anchor(root, text);
        let node = arena.get_mut(target);
        node.kind = Kind::Alias;
        node.tag.clear();
        node.value = text.to_string();
        node.content.clear();
        node.alias = anchored;
        Ok(())
    })
}

fn replace_with_copy(arena: &mut Arena, id: NodeId, source: NodeId) {
    let copy = arena.deep_copy(source);
    let replacement = arena.get(copy).clone();
    let children = replacement.content.clone();
    let node = arena.get_mut(id);
    node.kind = replacement.kind;
    node.tag = replacement.tag;
    node.value = replacement.value;
    node.style = replacement.style;
    node.alias = None;
    node.content = children.clone();
    for child in children {
        arena.get_mut(child).parent = Some(id);
    }
}

/// Replaces aliases below `id` with copies of what they point at, inlines
/// merge keys (direct keys win) and drops anchors.
fn explode_node(
    arena: &mut Arena,
    id: NodeId,
    visiting: &mut Vec<NodeId>,
) -> Result<(), EvalError> {
    if arena.get(id).kind == Kind::Alias {
        let Some(target) = arena.get(id).alias else {
            return Err(EvalError::TypeError(format!(
                "alias *{} ({}) has no anchor to point at",
                arena.get(id).value,
                arena.nice_path(id)
            )));
        };
        if visiting.contains(&target) {
            return Err(EvalError::TypeError(format!(
                "cannot explode cyclic alias *{} ({})",
                arena.get(id).value,
                arena.nice_path(id)
            )));
        }
        visiting.push(target);
        replace_with_copy(arena, id, target);
        let result = explode_node(arena, id, visiting);
        visiting.pop();
        return result;
    }

    arena.get_mut(id).anchor.clear();
    match arena.get(id).kind {
        Kind::Mapping => explode_map(arena, id, visiting),
        Kind::Sequence => {
            for child in arena.get(id).content.clone() {
                explode_node(arena, child, visiting)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn explode_map(arena: &mut Arena, id: NodeId, visiting: &mut Vec<NodeId>) -> Result<(), EvalError> {
    let entries = arena.entries(id);
    let direct: Vec<String> = entries
        .iter()
        .filter(|(k, _)| !is_merge_key(arena, *k))
        .map(|(k, _)| arena.get(*k).value.clone())
        .collect();

    let mut content = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for (key, value) in entries {
        if !is_merge_key(arena, key) {
            explode_node(arena, value, visiting)?;
            content.push(key);
            content.push(value);
            continue;
        }

        // later sources in a merge sequence lose to earlier ones
        explode_node(arena, value, visiting)?;
        let value = arena.resolve_alias(value);
        let sources = match arena.get(value).kind {
            Kind::Sequence => arena.get(value).content.clone(),
            _ => vec![value],
        };
        for source in sources {
            let source = arena.resolve_alias(source);
            if arena.get(source).kind != Kind::Mapping {
                continue;
            }
            for (merged_key, merged_value) in arena.entries(source) {
                let name = arena.get(merged_key).value.clone();
                if direct.contains(&name) || seen.contains(&name) {
                    continue;
                }
                seen.push(name);
                content.push(arena.deep_copy(merged_key));
                content.push(arena.deep_copy(merged_value));
            }
        }
    }

    arena.get_mut(id).content = content.clone();
    for pair in content.chunks_exact(2) {
        let name = arena.get(pair[0]).value.clone();
        arena.set_parent(pair[0], id, PathElement::Key(name.clone()));
        arena.set_parent(pair[1], id, PathElement::Key(name));
    }
    Ok(())
}

/// `explode(f)`: expands aliases and merge keys in the nodes `f` selects.
pub fn explode(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    for id in &context.matches {
        let targets = evaluator.eval_single(context, *id, expr.rhs())?.matches;
        for target in targets {
            explode_node(evaluator.arena_mut(), target, &mut Vec::new())?;
        }
    }
    Ok(context.clone())
}

fn read_int(
    evaluator: &mut Evaluator,
    context: &Context,
    read: impl Fn(&Arena, NodeId) -> usize,
) -> Result<Context, EvalError> {
    read_attribute(evaluator, context, TAG_INT, |arena, id| read(arena, id).to_string())
}

pub fn get_line(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_int(evaluator, context, |arena, id| arena.get(id).line)
}

pub fn get_column(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_int(evaluator, context, |arena, id| arena.get(id).column)
}

pub fn get_document_index(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_int(evaluator, context, |arena, id| arena.get(id).document_index)
}

pub fn get_filename(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_str(evaluator, context, |arena, id| arena.get(id).filename.clone())
}

pub fn get_file_index(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    read_int(evaluator, context, |arena, id| arena.get(id).file_index)
}

/// `split_doc`: every match becomes a document of its own.
pub fn split_document(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    for (index, id) in context.matches.iter().enumerate() {
        evaluator.arena_mut().get_mut(*id).document_index = index;
    }
    Ok(context.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TAG_MERGE;
    use crate::operators::describe;

    fn anchored_map(arena: &mut Arena) -> (NodeId, NodeId) {
        let root = arena.new_mapping();
        let base_key = arena.new_str("base");
        let base = arena.new_mapping();
        arena.get_mut(base).anchor = "b".into();
        let a = arena.new_str("a");
        let one = arena.new_int(1);
        arena.push_entry(base, a, one);
        arena.push_entry(root, base_key, base);
        (root, base)
    }

    #[test]
    fn test_explode_inlines_merge() {
        let mut arena = Arena::new();
        let (root, base) = anchored_map(&mut arena);
        let child_key = arena.new_str("child");
        let child = arena.new_mapping();
        let merge_key = arena.new_scalar(TAG_MERGE, "<<");
        let alias = arena.new_alias(base);
        arena.push_entry(child, merge_key, alias);
        let a = arena.new_str("a");
        let two = arena.new_int(2);
        arena.push_entry(child, a, two);
        arena.push_entry(root, child_key, child);

        explode_node(&mut arena, root, &mut Vec::new()).unwrap();
        let entries = arena.entries(child);
        assert_eq!(entries.len(), 1);
        assert_eq!(arena.get(entries[0].1).value, "2");
        assert!(arena.get(base).anchor.is_empty());
    }

    #[test]
    fn test_explode_rejects_cycle() {
        let mut arena = Arena::new();
        let (_, base) = anchored_map(&mut arena);
        let self_key = arena.new_str("me");
        let alias = arena.new_alias(base);
        arena.push_entry(base, self_key, alias);
        let err = explode_node(&mut arena, alias, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, EvalError::TypeError(_)));
        assert!(describe(&arena, base).contains("base"));
    }
}
