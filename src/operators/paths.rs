use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::GET_PARENT_N;
use crate::ast::preferences::{RecursiveDescentPrefs, TraversePrefs};
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, NodeId, PathElement, TAG_INT};
use crate::traverse;
use crate::value;

use super::{block_parts, expect_sequence, groups, int_arg, path_element_node};

fn path_node(arena: &mut Arena, path: &[PathElement]) -> NodeId {
    let seq = arena.new_sequence();
    for element in path {
        let item = path_element_node(arena, element);
        arena.push_child(seq, item);
    }
    seq
}

/// `path`: where each match sits in its document.
pub fn get_path(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let path = arena.path(*id);
        results.push(path_node(arena, &path));
    }
    Ok(context.child(results))
}

/// `paths`: the path of every node below each match.
pub fn paths(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = RecursiveDescentPrefs {
        recurse_array: true,
        traverse: TraversePrefs::default(),
    };
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let mut nodes = Vec::new();
        traverse::recursive_descent(arena, *id, prefs, &mut nodes);
        let base = arena.path(*id).len();
        for node in nodes.into_iter().skip(1) {
            let path = arena.path(node);
            let relative = path.get(base..).unwrap_or_default().to_vec();
            results.push(path_node(arena, &relative));
        }
    }
    Ok(context.child(results))
}

/// Reads a path sequence into elements. Ints index, everything else is a key.
fn path_elements(arena: &Arena, seq: NodeId) -> Result<Vec<PathElement>, EvalError> {
    let seq = expect_sequence(arena, seq, "path")?;
    Ok(arena
        .get(seq)
        .content
        .iter()
        .map(|id| {
            let node = arena.get(arena.resolve_alias(*id));
            match value::parse_int(&node.value) {
                Some((_, n)) if node.effective_tag() == TAG_INT && n >= 0 => {
                    PathElement::Index(n as usize)
                }
                _ => PathElement::Key(node.value.clone()),
            }
        })
        .collect())
}

/// Follows `path` from `start`. Read-only contexts stop at the first miss;
/// writable ones create what is missing.
fn walk(
    arena: &mut Arena,
    context: &Context,
    start: NodeId,
    path: &[PathElement],
) -> Result<Option<NodeId>, EvalError> {
    let prefs = TraversePrefs {
        exact_key_match: true,
        ..TraversePrefs::default()
    };
    let mut current = start;
    for element in path {
        let next = match element {
            PathElement::Key(key) => traverse::traverse_key(arena, context, current, key, prefs)?,
            PathElement::Index(index) => {
                traverse::traverse_index(arena, context, current, *index as i64, prefs)?
            }
        };
        match next.first() {
            Some(found) => current = *found,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// `getpath(p)`: the value at `p`, or null when it does not exist.
pub fn getpath(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let Some(path) = evaluator.eval_single_readonly(context, *id, expr.rhs())?.first() else {
            continue;
        };
        let elements = path_elements(evaluator.arena(), path)?;
        let readonly = context.single_readonly_child(*id);
        let arena = evaluator.arena_mut();
        let found = match walk(arena, &readonly, *id, &elements)? {
            Some(found) => found,
            None => arena.new_null(),
        };
        results.push(found);
    }
    Ok(context.child(results))
}

/// `setpath(p; v)`: writes `v` at `p`, creating missing structure.
pub fn setpath(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (path_expr, value_expr) = block_parts(expr.rhs());
    if value_expr.is_none() {
        return Err(EvalError::ArityError("setpath expects setpath(path; value)".to_string()));
    }
    let prefs = expr.operation.prefs.assign();

    for id in &context.matches {
        let Some(path) = evaluator.eval_single_readonly(context, *id, path_expr)?.first() else {
            continue;
        };
        let values = evaluator.eval_single_readonly(context, *id, value_expr)?.matches;
        if values.len() != 1 {
            return Err(EvalError::ArityError(format!(
                "setpath value must produce exactly one result, got {}",
                values.len()
            )));
        }
        let elements = path_elements(evaluator.arena(), path)?;
        let writable = context.single_child(*id).writable();
        let arena = evaluator.arena_mut();
        if let Some(target) = walk(arena, &writable, *id, &elements)? {
            arena.update_from(target, values[0], &prefs);
        }
    }
    Ok(context.clone())
}

/// Detaches `target` from its parent. Roots are dropped from `remaining`.
fn detach(arena: &mut Arena, target: NodeId, remaining: &mut Vec<NodeId>) {
    match arena.get(target).parent {
        Some(parent) => {
            let owner = arena.resolve_alias(parent);
            if !arena.remove_child(owner, target) {
                remaining.retain(|id| *id != target);
            }
        }
        None => remaining.retain(|id| *id != target),
    }
}

/// `del(f)`: removes every node `f` selects. Removal runs back to front so
/// earlier sequence indices stay valid.
pub fn delete(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for group in groups(evaluator, context) {
        let targets = evaluator.eval_readonly(&group, expr.rhs())?.matches;
        let mut remaining = group.matches.clone();
        let arena = evaluator.arena_mut();
        for target in targets.into_iter().rev() {
            detach(arena, target, &mut remaining);
        }
        results.extend(remaining);
    }
    Ok(context.child(results))
}

/// `delpaths(ps)`: deletes each path in the sequence `ps`.
pub fn delpaths(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let Some(list) = evaluator.eval_single_readonly(context, *id, expr.rhs())?.first() else {
            results.push(*id);
            continue;
        };
        let readonly = context.single_readonly_child(*id);
        let arena = evaluator.arena_mut();
        let list = expect_sequence(arena, list, "delpaths")?;
        let mut found = Vec::new();
        for path in arena.get(list).content.clone() {
            let elements = path_elements(arena, path)?;
            if let Some(target) = walk(arena, &readonly, *id, &elements)? {
                found.push(target);
            }
        }
        let mut remaining = vec![*id];
        for target in found.into_iter().rev() {
            detach(arena, target, &mut remaining);
        }
        results.extend(remaining);
    }
    Ok(context.child(results))
}

/// `key`: the key or index each match was reached by.
pub fn get_key(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        if let Some(key) = arena.get(*id).path_key.clone() {
            results.push(path_element_node(arena, &key));
        }
    }
    Ok(context.child(results))
}

fn ancestors(arena: &Arena, id: NodeId) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut current = id;
    while let Some(parent) = arena.get(current).parent {
        if chain.contains(&parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// `parent` and `parent(n)`. A negative `n` counts down from the root:
/// `parent(-1)` is the root itself.
pub fn get_parent(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let levels = if expr.is(&GET_PARENT_N) {
            int_arg(evaluator, context, *id, expr.rhs(), "parent")?
        } else {
            1
        };
        let chain = ancestors(evaluator.arena(), *id);
        let found = match levels {
            0 => Some(*id),
            n if n > 0 => chain.get(n as usize - 1).copied(),
            n => {
                let from_root = n.unsigned_abs() as usize;
                chain.len().checked_sub(from_root).and_then(|i| chain.get(i).copied())
            }
        };
        results.extend(found);
    }
    Ok(context.child(results))
}

/// `parents`: every ancestor, nearest first.
pub fn get_parents(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let chain = ancestors(arena, *id);
        let seq = arena.new_sequence();
        for ancestor in chain {
            let copy = arena.deep_copy(ancestor);
            arena.push_child(seq, copy);
        }
        results.push(seq);
    }
    Ok(context.child(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Kind;
    use crate::operators::describe;

    #[test]
    fn test_walk_readonly_misses() {
        let mut arena = Arena::new();
        let root = arena.new_mapping();
        let context = Context::new(vec![root]);
        let path = vec![PathElement::Key("a".into()), PathElement::Index(0)];
        assert_eq!(walk(&mut arena, &context, root, &path).unwrap(), None);
        assert!(arena.get(root).content.is_empty());
    }

    #[test]
    fn test_walk_writable_creates() {
        let mut arena = Arena::new();
        let root = arena.new_mapping();
        let context = Context::new(vec![root]).writable();
        let path = vec![PathElement::Key("a".into()), PathElement::Index(1)];
        let target = walk(&mut arena, &context, root, &path).unwrap().unwrap();
        assert_eq!(arena.path(target), path);
        let seq = arena.map_value(root, "a").unwrap();
        assert_eq!(arena.get(seq).kind, Kind::Sequence);
        assert_eq!(arena.get(seq).content.len(), 2);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut arena = Arena::new();
        let root = arena.new_mapping();
        let key = arena.new_str("a");
        let seq = arena.new_sequence();
        arena.push_entry(root, key, seq);
        let item = arena.new_int(1);
        arena.push_child(seq, item);
        assert_eq!(ancestors(&arena, item), vec![seq, root]);
        assert!(describe(&arena, item).contains("a[0]"));
    }
}
