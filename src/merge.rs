//! Deep merge of one node tree into another.
//!
//! The right tree is walked with recursive descent (aliases are not
//! entered). Each node found is written onto the same relative path of the
//! left tree, creating missing structure on the way:
//!
//! - maps, and sequences under [`ArrayMergePolicy::Update`], only contribute
//!   their attributes; their children arrive one by one as the walk continues
//! - scalars, aliases and sequences under [`ArrayMergePolicy::Overwrite`]
//!   replace the left value
//! - sequences under [`ArrayMergePolicy::Append`] are appended to the left one

use log::debug;

use crate::ast::preferences::{
    ArrayMergePolicy, AssignPrefs, CommentsPolicy, MultiplyPrefs, RecursiveDescentPrefs,
    TraversePrefs,
};
use crate::context::Context;
use crate::evaluator::EvalError;
use crate::node::{Arena, Kind, NodeId, PathElement, TAG_MERGE, TAG_SEQ};
use crate::traverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    pub arrays: ArrayMergePolicy,
    pub comments: CommentsPolicy,
    /// Skip paths that do not already exist on the left
    pub only_existing: bool,
    /// Only write where the left value is null (or missing)
    pub only_new: bool,
    pub clobber_custom_tags: bool,
}

impl MergeOptions {
    pub fn from_prefs(prefs: &MultiplyPrefs) -> Self {
        MergeOptions {
            arrays: prefs.arrays,
            comments: prefs.comments,
            only_existing: prefs.only_existing,
            only_new: prefs.assign.only_write_null,
            clobber_custom_tags: prefs.assign.clobber_custom_tags,
        }
    }

    fn assign_prefs(&self) -> AssignPrefs {
        AssignPrefs {
            dont_overwrite_anchor: true,
            only_write_null: self.only_new,
            clobber_custom_tags: self.clobber_custom_tags,
        }
    }
}

/// Merges `right` into `left` in place and returns `left`.
pub fn merge(
    arena: &mut Arena,
    left: NodeId,
    right: NodeId,
    options: &MergeOptions,
) -> Result<NodeId, EvalError> {
    let descent = RecursiveDescentPrefs {
        recurse_array: options.arrays == ArrayMergePolicy::Update,
        traverse: TraversePrefs {
            dont_follow_alias: true,
            include_map_keys: true,
            exact_key_match: true,
            ..TraversePrefs::default()
        },
    };
    let mut nodes = Vec::new();
    traverse::recursive_descent(arena, right, descent, &mut nodes);

    let base = arena.path(right).len();
    debug!("merging {} node(s) with {:?}", nodes.len(), options);

    for node in nodes {
        if arena.get(node).tag == TAG_MERGE {
            continue;
        }
        let full_path = arena.path(node);
        let relative = if node == right {
            Vec::new()
        } else {
            full_path.get(base..).map(<[PathElement]>::to_vec).unwrap_or_default()
        };
        apply(arena, left, node, &relative, options)?;
    }
    Ok(left)
}

fn navigate(
    arena: &mut Arena,
    start: NodeId,
    path: &[PathElement],
    options: &MergeOptions,
    prefs: TraversePrefs,
) -> Result<Vec<NodeId>, EvalError> {
    let mut context = Context::new(vec![start]);
    context.dont_auto_create = options.only_existing;

    let mut current = vec![start];
    for element in path {
        let mut next = Vec::new();
        for id in current {
            let found = match element {
                PathElement::Key(key) => traverse::traverse_key(arena, &context, id, key, prefs)?,
                PathElement::Index(index) => {
                    traverse::traverse_index(arena, &context, id, *index as i64, prefs)?
                }
            };
            next.extend(found);
        }
        current = next;
    }
    Ok(current)
}

fn apply(
    arena: &mut Arena,
    left: NodeId,
    source: NodeId,
    path: &[PathElement],
    options: &MergeOptions,
) -> Result<(), EvalError> {
    let exact = TraversePrefs {
        exact_key_match: true,
        ..TraversePrefs::default()
    };

    if arena.get(source).is_map_key {
        let Some((PathElement::Key(name), parent_path)) = path.split_last() else {
            return Ok(());
        };
        let key_prefs = TraversePrefs {
            include_map_keys: true,
            dont_include_map_values: true,
            ..exact
        };
        let mut keys = Vec::new();
        for parent in navigate(arena, left, parent_path, options, exact)? {
            keys.extend(traverse::traverse_key(
                arena,
                &writable_unless(options),
                parent,
                name,
                key_prefs,
            )?);
        }
        for key in keys {
            copy_comments(arena, key, source, options.comments);
        }
        return Ok(());
    }

    let assign_prefs = options.assign_prefs();
    let kind = arena.get(source).kind;
    for target in navigate(arena, left, path, options, exact)? {
        if options.only_new && !arena.get(target).is_null() && kind != Kind::Mapping {
            continue;
        }
        match kind {
            Kind::Sequence if options.arrays == ArrayMergePolicy::Append => {
                append(arena, target, source, &assign_prefs, options.comments);
            }
            Kind::Mapping => {
                if options.only_new && !arena.get(target).is_null() {
                    continue;
                }
                arena.update_attributes_from(target, source, &assign_prefs, options.comments);
            }
            Kind::Sequence if options.arrays == ArrayMergePolicy::Update => {
                arena.update_attributes_from(target, source, &assign_prefs, options.comments);
            }
            _ => assign_value(arena, target, source, &assign_prefs, options.comments),
        }
    }
    Ok(())
}

fn writable_unless(options: &MergeOptions) -> Context {
    let mut context = Context::default();
    context.dont_auto_create = options.only_existing;
    context
}

/// Replaces `target` with a copy of `source`, then applies the comment policy.
pub fn assign_value(
    arena: &mut Arena,
    target: NodeId,
    source: NodeId,
    prefs: &AssignPrefs,
    comments: CommentsPolicy,
) {
    let saved = {
        let node = arena.get(target);
        (
            node.head_comment.clone(),
            node.line_comment.clone(),
            node.foot_comment.clone(),
        )
    };
    arena.update_from(target, source, prefs);
    {
        let node = arena.get_mut(target);
        node.head_comment = saved.0;
        node.line_comment = saved.1;
        node.foot_comment = saved.2;
    }
    copy_comments(arena, target, source, comments);
}

fn append(
    arena: &mut Arena,
    target: NodeId,
    source: NodeId,
    prefs: &AssignPrefs,
    comments: CommentsPolicy,
) {
    let target_kind = arena.get(arena.resolve_alias(target)).kind;
    if target_kind != Kind::Sequence {
        if arena.get(target).is_null() {
            let node = arena.get_mut(target);
            node.kind = Kind::Sequence;
            node.tag = TAG_SEQ.to_string();
            node.value.clear();
        } else {
            assign_value(arena, target, source, prefs, comments);
            return;
        }
    }
    let sequence = arena.resolve_alias(target);
    for child in arena.get(source).content.clone() {
        let copy = arena.deep_copy(child);
        arena.push_child(sequence, copy);
    }
    copy_comments(arena, sequence, source, comments);
}

fn copy_comments(arena: &mut Arena, target: NodeId, source: NodeId, policy: CommentsPolicy) {
    let (head, line, foot) = {
        let node = arena.get(source);
        (
            node.head_comment.clone(),
            node.line_comment.clone(),
            node.foot_comment.clone(),
        )
    };
    let node = arena.get_mut(target);
    policy.apply(&mut node.head_comment, &head, "\n");
    policy.apply(&mut node.line_comment, &line, " ");
    policy.apply(&mut node.foot_comment, &foot, "\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_seq(arena: &mut Arena, values: &[i64]) -> NodeId {
        let seq = arena.new_sequence();
        for v in values {
            let item = arena.new_int(*v);
            arena.push_child(seq, item);
        }
        seq
    }

    fn map_with(arena: &mut Arena, key: &str, value: NodeId) -> NodeId {
        let map = arena.new_mapping();
        let key = arena.new_str(key);
        arena.push_entry(map, key, value);
        map
    }

    fn seq_values(arena: &Arena, map: NodeId, key: &str) -> Vec<String> {
        let seq = arena.map_value(map, key).unwrap();
        arena
            .get(seq)
            .content
            .iter()
            .map(|id| arena.get(*id).value.clone())
            .collect()
    }

    fn merged(arrays: ArrayMergePolicy) -> Vec<String> {
        let mut arena = Arena::new();
        let l = int_seq(&mut arena, &[1, 2]);
        let left = map_with(&mut arena, "a", l);
        let r = int_seq(&mut arena, &[3, 4]);
        let right = map_with(&mut arena, "a", r);
        let options = MergeOptions {
            arrays,
            ..MergeOptions::default()
        };
        merge(&mut arena, left, right, &options).unwrap();
        seq_values(&arena, left, "a")
    }

    #[test]
    fn test_array_policies() {
        assert_eq!(merged(ArrayMergePolicy::Update), vec!["3", "4"]);
        assert_eq!(merged(ArrayMergePolicy::Overwrite), vec!["3", "4"]);
        assert_eq!(merged(ArrayMergePolicy::Append), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_update_keeps_longer_left_tail() {
        let mut arena = Arena::new();
        let left = int_seq(&mut arena, &[1, 2, 3]);
        let right = int_seq(&mut arena, &[9]);
        merge(&mut arena, left, right, &MergeOptions::default()).unwrap();
        let values: Vec<_> = arena
            .get(left)
            .content
            .iter()
            .map(|id| arena.get(*id).value.clone())
            .collect();
        assert_eq!(values, vec!["9", "2", "3"]);
    }

    #[test]
    fn test_nested_maps_merge() {
        let mut arena = Arena::new();
        let one = arena.new_int(1);
        let inner_left = map_with(&mut arena, "x", one);
        let left = map_with(&mut arena, "a", inner_left);
        let two = arena.new_int(2);
        let inner_right = map_with(&mut arena, "y", two);
        let right = map_with(&mut arena, "a", inner_right);

        merge(&mut arena, left, right, &MergeOptions::default()).unwrap();
        let a = arena.map_value(left, "a").unwrap();
        assert_eq!(arena.get(arena.map_value(a, "x").unwrap()).value, "1");
        assert_eq!(arena.get(arena.map_value(a, "y").unwrap()).value, "2");
    }

    #[test]
    fn test_only_existing_skips_new_keys() {
        let mut arena = Arena::new();
        let one = arena.new_int(1);
        let left = map_with(&mut arena, "a", one);
        let two = arena.new_int(2);
        let right = map_with(&mut arena, "b", two);
        let options = MergeOptions {
            only_existing: true,
            ..MergeOptions::default()
        };
        merge(&mut arena, left, right, &options).unwrap();
        assert!(arena.map_value(left, "b").is_none());
    }

    #[test]
    fn test_only_new_keeps_existing_values() {
        let mut arena = Arena::new();
        let one = arena.new_int(1);
        let left = map_with(&mut arena, "a", one);
        let two = arena.new_int(2);
        let right = map_with(&mut arena, "a", two);
        let three = arena.new_int(3);
        let key = arena.new_str("b");
        arena.push_entry(right, key, three);
        let options = MergeOptions {
            only_new: true,
            ..MergeOptions::default()
        };
        merge(&mut arena, left, right, &options).unwrap();
        assert_eq!(arena.get(arena.map_value(left, "a").unwrap()).value, "1");
        assert_eq!(arena.get(arena.map_value(left, "b").unwrap()).value, "3");
    }

    fn merged_line_comment(
        left_comment: &str,
        right_comment: &str,
        comments: CommentsPolicy,
    ) -> String {
        let mut arena = Arena::new();
        let one = arena.new_int(1);
        arena.get_mut(one).line_comment = left_comment.to_string();
        let left = map_with(&mut arena, "a", one);
        let two = arena.new_int(2);
        arena.get_mut(two).line_comment = right_comment.to_string();
        let right = map_with(&mut arena, "a", two);
        let options = MergeOptions {
            comments,
            ..MergeOptions::default()
        };
        merge(&mut arena, left, right, &options).unwrap();
        let a = arena.map_value(left, "a").unwrap();
        assert_eq!(arena.get(a).value, "2");
        arena.get(a).line_comment.clone()
    }

    #[test]
    fn test_comment_policies() {
        assert_eq!(
            merged_line_comment("# left", "# right", CommentsPolicy::Append),
            "# left # right"
        );
        assert_eq!(
            merged_line_comment("# left", "# right", CommentsPolicy::Overwrite),
            "# right"
        );
        assert_eq!(merged_line_comment("# left", "", CommentsPolicy::Overwrite), "");
        assert_eq!(
            merged_line_comment("# left", "# right", CommentsPolicy::Ignore),
            "# left"
        );
        assert_eq!(merged_line_comment("", "# right", CommentsPolicy::Ignore), "");
        assert_eq!(
            merged_line_comment("# left", "# right", CommentsPolicy::SetIfBlank),
            "# left"
        );
        assert_eq!(
            merged_line_comment("", "# right", CommentsPolicy::SetIfBlank),
            "# right"
        );
    }
}
