//! Path navigation over the node arena.
//!
//! Reads never fail on a missing key or index: they just produce nothing.
//! In a writable context a miss creates the missing entry instead, turning
//! null placeholders into maps or sequences depending on the segment shape.
//! Every node reached records its parent and key so that `path`, `parent`
//! and `del` can find their way back.

use regex::Regex;

use crate::ast::preferences::{RecursiveDescentPrefs, TraversePrefs};
use crate::context::Context;
use crate::evaluator::EvalError;
use crate::node::{Arena, Kind, NodeId, PathElement, TAG_INT, TAG_MAP, TAG_MERGE, TAG_NULL, TAG_SEQ};
use crate::value;

const DIRECT_KEY: usize = usize::MAX;

/// Most placeholder slots a single write may append to a sequence.
pub const MAX_SEQUENCE_GROWTH: i64 = 1 << 20;

fn writable(context: &Context, prefs: TraversePrefs) -> bool {
    !context.dont_auto_create && !prefs.dont_auto_create
}

/// Glob match of a map key. `*` matches any run of characters and `?` a
/// single one; without either the match is exact.
pub fn key_matches(pattern: &str, key: &str, exact: bool) -> bool {
    if exact || !(pattern.contains('*') || pattern.contains('?')) {
        return pattern == key;
    }
    if pattern == "*" || pattern == "**" {
        return true;
    }
    let mut expression = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression).is_ok_and(|re| re.is_match(key))
}

pub fn is_merge_key(arena: &Arena, key: NodeId) -> bool {
    let node = arena.get(key);
    node.tag == TAG_MERGE || (node.value == "<<" && node.kind == Kind::Scalar)
}

/// Matches collected while scanning a map. Direct keys are all kept in
/// source order, duplicates included. A merged entry is dropped when a
/// direct key of the same name exists, and otherwise only replaces an
/// earlier merged entry from a source of equal or lower rank.
#[derive(Default)]
struct MapMatches {
    entries: Vec<(String, NodeId, usize)>,
}

impl MapMatches {
    fn offer(&mut self, name: String, id: NodeId, rank: usize) {
        let existing = self.entries.iter().position(|(n, _, _)| *n == name);
        if rank == DIRECT_KEY {
            match existing {
                Some(index) if self.entries[index].2 != DIRECT_KEY => {
                    self.entries[index] = (name, id, rank);
                }
                _ => self.entries.push((name, id, rank)),
            }
            return;
        }
        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                if entry.2 != DIRECT_KEY && rank >= entry.2 {
                    entry.1 = id;
                    entry.2 = rank;
                }
            }
            None => self.entries.push((name, id, rank)),
        }
    }

    fn into_ids(self) -> Vec<NodeId> {
        self.entries.into_iter().map(|(_, id, _)| id).collect()
    }
}

fn scan_map(
    arena: &mut Arena,
    map: NodeId,
    wanted: Option<&str>,
    prefs: TraversePrefs,
    rank: usize,
    matches: &mut MapMatches,
    depth: usize,
) {
    if depth > arena.len() {
        return;
    }
    for (key, value) in arena.entries(map) {
        let name = arena.get(key).value.clone();
        if is_merge_key(arena, key) && !prefs.dont_follow_alias && wanted != Some("<<") {
            scan_merge_source(arena, value, wanted, prefs, rank, matches, depth + 1);
            continue;
        }
        let hit = match wanted {
            None => true,
            Some(pattern) => key_matches(pattern, &name, prefs.exact_key_match),
        };
        if !hit {
            continue;
        }
        arena.set_parent(value, map, PathElement::Key(name.clone()));
        if prefs.include_map_keys {
            matches.offer(format!("key:{}", name), key, rank);
        }
        if !prefs.dont_include_map_values {
            matches.offer(format!("value:{}", name), value, rank);
        }
    }
}

fn scan_merge_source(
    arena: &mut Arena,
    source: NodeId,
    wanted: Option<&str>,
    prefs: TraversePrefs,
    rank: usize,
    matches: &mut MapMatches,
    depth: usize,
) {
    let target = arena.resolve_alias(source);
    match arena.get(target).kind {
        Kind::Mapping => {
            let inner_rank = if rank == DIRECT_KEY { 0 } else { rank };
            scan_map(arena, target, wanted, prefs, inner_rank, matches, depth);
        }
        Kind::Sequence => {
            let sources = arena.get(target).content.clone();
            for (position, item) in sources.into_iter().enumerate() {
                let item = arena.resolve_alias(item);
                if arena.get(item).kind == Kind::Mapping {
                    scan_map(arena, item, wanted, prefs, position, matches, depth);
                }
            }
        }
        _ => {}
    }
}

fn vivify(arena: &mut Arena, id: NodeId, kind: Kind) {
    let node = arena.get_mut(id);
    node.kind = kind;
    node.tag = if kind == Kind::Mapping { TAG_MAP } else { TAG_SEQ }.to_string();
    node.value.clear();
    node.content.clear();
}

fn resolve(arena: &Arena, id: NodeId, prefs: TraversePrefs) -> NodeId {
    if prefs.dont_follow_alias {
        id
    } else {
        arena.resolve_alias(id)
    }
}

/// `.key` on one node.
pub fn traverse_key(
    arena: &mut Arena,
    context: &Context,
    id: NodeId,
    key: &str,
    prefs: TraversePrefs,
) -> Result<Vec<NodeId>, EvalError> {
    let target = resolve(arena, id, prefs);
    let node = arena.get(target);

    match node.kind {
        Kind::Mapping => {}
        Kind::Scalar if node.tag == TAG_NULL && writable(context, prefs) => {
            vivify(arena, target, Kind::Mapping);
        }
        _ => return Ok(Vec::new()),
    }

    let mut matches = MapMatches::default();
    scan_map(arena, target, Some(key), prefs, DIRECT_KEY, &mut matches, 0);
    let found = matches.into_ids();
    if !found.is_empty() || !writable(context, prefs) {
        return Ok(found);
    }

    let key_node = arena.new_str(key);
    let value_node = arena.new_null();
    arena.push_entry(target, key_node, value_node);
    let mut created = Vec::new();
    if prefs.include_map_keys {
        created.push(key_node);
    }
    if !prefs.dont_include_map_values {
        created.push(value_node);
    }
    Ok(created)
}

/// `.[n]` on one node. Negative indices count from the end.
pub fn traverse_index(
    arena: &mut Arena,
    context: &Context,
    id: NodeId,
    index: i64,
    prefs: TraversePrefs,
) -> Result<Vec<NodeId>, EvalError> {
    let target = resolve(arena, id, prefs);
    let node = arena.get(target);

    match node.kind {
        Kind::Sequence => {}
        Kind::Mapping => {
            let exact = TraversePrefs {
                exact_key_match: true,
                ..prefs
            };
            return traverse_key(arena, context, target, &index.to_string(), exact);
        }
        Kind::Scalar if node.tag == TAG_NULL => {
            if !writable(context, prefs) {
                return Ok(Vec::new());
            }
            vivify(arena, target, Kind::Sequence);
        }
        _ if prefs.optional => return Ok(Vec::new()),
        _ => {
            return Err(EvalError::TypeError(format!(
                "cannot index {} ({}) with {}",
                node.tag,
                arena.nice_path(target),
                index
            )));
        }
    }

    let len = arena.get(target).content.len() as i64;
    let position = if index < 0 { len + index } else { index };
    if position < 0 {
        return Ok(Vec::new());
    }
    if position >= len {
        if !writable(context, prefs) {
            return Ok(Vec::new());
        }
        if position - len >= MAX_SEQUENCE_GROWTH {
            return Err(EvalError::TypeError(format!(
                "cannot extend {} ({}) of length {} to index {}",
                arena.get(target).tag,
                arena.nice_path(target),
                len,
                position
            )));
        }
        for _ in len..=position {
            let placeholder = arena.new_null();
            arena.push_child(target, placeholder);
        }
    }

    let position = position as usize;
    let child = arena.get(target).content[position];
    arena.set_parent(child, target, PathElement::Index(position));
    Ok(vec![child])
}

/// `.[]` on one node: every value of a map (merge keys expanded) or every
/// element of a sequence. Never creates anything.
pub fn splat(arena: &mut Arena, id: NodeId, prefs: TraversePrefs) -> Vec<NodeId> {
    let target = resolve(arena, id, prefs);
    match arena.get(target).kind {
        Kind::Mapping => {
            let mut matches = MapMatches::default();
            scan_map(arena, target, None, prefs, DIRECT_KEY, &mut matches, 0);
            matches.into_ids()
        }
        Kind::Sequence => {
            let children = arena.get(target).content.clone();
            for (index, child) in children.iter().enumerate() {
                arena.set_parent(*child, target, PathElement::Index(index));
            }
            children
        }
        _ => Vec::new(),
    }
}

/// `.[i, j, ...]` on one node, with the index nodes produced by the bracket
/// contents. No indices means splat.
pub fn traverse_indices(
    arena: &mut Arena,
    context: &Context,
    id: NodeId,
    indices: &[NodeId],
    prefs: TraversePrefs,
) -> Result<Vec<NodeId>, EvalError> {
    if indices.is_empty() {
        return Ok(splat(arena, id, prefs));
    }

    let mut results = Vec::new();
    for index in indices {
        let index_node = arena.get(arena.resolve_alias(*index));
        let text = index_node.value.clone();
        if index_node.effective_tag() == TAG_INT {
            let Some((_, n)) = value::parse_int(&text) else {
                continue;
            };
            results.extend(traverse_index(arena, context, id, n, prefs)?);
        } else {
            let target = resolve(arena, id, prefs);
            if arena.get(target).kind == Kind::Sequence {
                if prefs.optional {
                    continue;
                }
                return Err(EvalError::TypeError(format!(
                    "cannot index {} ({}) with '{}'",
                    arena.get(target).tag,
                    arena.nice_path(target),
                    text
                )));
            }
            results.extend(traverse_key(arena, context, id, &text, prefs)?);
        }
    }
    Ok(results)
}

/// `..`: the node itself, then every descendant in document order. Alias
/// nodes are emitted but never entered.
pub fn recursive_descent(
    arena: &mut Arena,
    id: NodeId,
    prefs: RecursiveDescentPrefs,
    out: &mut Vec<NodeId>,
) {
    out.push(id);
    match arena.get(id).kind {
        Kind::Mapping => {
            for (key, value) in arena.entries(id) {
                let name = arena.get(key).value.clone();
                arena.set_parent(key, id, PathElement::Key(name.clone()));
                arena.set_parent(value, id, PathElement::Key(name));
                if prefs.traverse.include_map_keys {
                    out.push(key);
                }
                recursive_descent(arena, value, prefs, out);
            }
        }
        Kind::Sequence if prefs.recurse_array => {
            let children = arena.get(id).content.clone();
            for (index, child) in children.into_iter().enumerate() {
                arena.set_parent(child, id, PathElement::Index(index));
                recursive_descent(arena, child, prefs, out);
            }
        }
        _ => {}
    }
}
