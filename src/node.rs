//! Document node model.
//!
//! Every node of every loaded document lives in a single [`Arena`] and is
//! addressed by a [`NodeId`] handle. Handles are plain indices, so aliases,
//! parent back-references and shared children are all just copies of a
//! `NodeId`. Cyclic anchors are therefore representable without any
//! ownership trouble, and deep copies never follow an alias into its target.
//!
//! # Shape
//!
//! - A [`Kind::Mapping`] node stores its pairs flattened in `content`:
//!   keys at even indices, values at odd indices.
//! - A [`Kind::Sequence`] node stores its elements in `content`.
//! - A [`Kind::Alias`] node has no content; `alias` points at the anchored
//!   node and `value` carries the anchor name.
//! - Scalars carry their text in `value`; the tag says how to read it.
//!
//! # Parents
//!
//! `parent` and `path_key` are weak bookkeeping written by traversal. They
//! describe where the node was last reached from and can go stale after a
//! structural edit elsewhere; [`Arena::path`] walks them on demand.

use std::fmt;

use crate::ast::preferences::{AssignPrefs, CommentsPolicy};
use crate::value;

pub const TAG_NULL: &str = "!!null";
pub const TAG_BOOL: &str = "!!bool";
pub const TAG_INT: &str = "!!int";
pub const TAG_FLOAT: &str = "!!float";
pub const TAG_STR: &str = "!!str";
pub const TAG_MAP: &str = "!!map";
pub const TAG_SEQ: &str = "!!seq";
pub const TAG_MERGE: &str = "!!merge";
pub const TAG_TIMESTAMP: &str = "!!timestamp";

/// Handle to a node stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    #[default]
    Scalar,
    Mapping,
    Sequence,
    Alias,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Scalar => "scalar",
            Kind::Mapping => "map",
            Kind::Sequence => "seq",
            Kind::Alias => "alias",
        }
    }
}

/// Formatting hint carried through evaluation for the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Default,
    Tagged,
    DoubleQuoted,
    SingleQuoted,
    Literal,
    Folded,
    Flow,
}

impl Style {
    pub fn name(self) -> &'static str {
        match self {
            Style::Default => "",
            Style::Tagged => "tagged",
            Style::DoubleQuoted => "double",
            Style::SingleQuoted => "single",
            Style::Literal => "literal",
            Style::Folded => "folded",
            Style::Flow => "flow",
        }
    }

    pub fn from_name(name: &str) -> Option<Style> {
        match name {
            "" => Some(Style::Default),
            "tagged" => Some(Style::Tagged),
            "double" => Some(Style::DoubleQuoted),
            "single" => Some(Style::SingleQuoted),
            "literal" => Some(Style::Literal),
            "folded" => Some(Style::Folded),
            "flow" => Some(Style::Flow),
            _ => None,
        }
    }
}

/// One step of a path from a document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Key(key) => write!(f, "{}", key),
            PathElement::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A document node.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub kind: Kind,
    pub tag: String,
    pub value: String,
    pub content: Vec<NodeId>,
    pub style: Style,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
    pub anchor: String,
    /// Target of an alias node. Never owned.
    pub alias: Option<NodeId>,
    pub line: usize,
    pub column: usize,

    pub parent: Option<NodeId>,
    pub path_key: Option<PathElement>,
    pub is_map_key: bool,
    pub document_index: usize,
    pub file_index: usize,
    pub filename: String,
    pub evaluate_together: bool,
}

impl Node {
    pub fn scalar(tag: &str, value: impl Into<String>) -> Self {
        Node {
            kind: Kind::Scalar,
            tag: tag.to_string(),
            value: value.into(),
            ..Node::default()
        }
    }

    pub fn collection(kind: Kind) -> Self {
        let tag = match kind {
            Kind::Mapping => TAG_MAP,
            Kind::Sequence => TAG_SEQ,
            _ => "",
        };
        Node {
            kind,
            tag: tag.to_string(),
            ..Node::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == Kind::Scalar && self.tag == TAG_NULL
    }

    /// The tag used for arithmetic and comparison. Custom tags such as
    /// `!version` fall back to whatever the value text looks like.
    pub fn effective_tag(&self) -> &str {
        if self.kind != Kind::Scalar || self.tag.starts_with("!!") {
            return &self.tag;
        }
        if self.tag.is_empty() || self.tag.starts_with('!') {
            return value::guess_tag(&self.value);
        }
        &self.tag
    }
}

/// Owner of every node in a document set.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn new_scalar(&mut self, tag: &str, value: impl Into<String>) -> NodeId {
        self.insert(Node::scalar(tag, value))
    }

    pub fn new_null(&mut self) -> NodeId {
        self.new_scalar(TAG_NULL, "null")
    }

    pub fn new_bool(&mut self, b: bool) -> NodeId {
        self.new_scalar(TAG_BOOL, if b { "true" } else { "false" })
    }

    pub fn new_int(&mut self, n: i64) -> NodeId {
        self.new_scalar(TAG_INT, n.to_string())
    }

    pub fn new_float(&mut self, f: f64) -> NodeId {
        self.new_scalar(TAG_FLOAT, value::format_float(f))
    }

    pub fn new_str(&mut self, s: impl Into<String>) -> NodeId {
        self.new_scalar(TAG_STR, s)
    }

    pub fn new_mapping(&mut self) -> NodeId {
        self.insert(Node::collection(Kind::Mapping))
    }

    pub fn new_sequence(&mut self) -> NodeId {
        self.insert(Node::collection(Kind::Sequence))
    }

    /// Creates an alias node pointing at `target`.
    pub fn new_alias(&mut self, target: NodeId) -> NodeId {
        let anchor = self.nodes[target.0].anchor.clone();
        self.insert(Node {
            kind: Kind::Alias,
            value: anchor,
            alias: Some(target),
            ..Node::default()
        })
    }

    /// Creates a new node that stands in for `original`: it inherits the
    /// original's position and document bookkeeping.
    pub fn create_replacement(
        &mut self,
        original: NodeId,
        kind: Kind,
        tag: &str,
        value: impl Into<String>,
    ) -> NodeId {
        let source = &self.nodes[original.0];
        let node = Node {
            kind,
            tag: tag.to_string(),
            value: value.into(),
            parent: source.parent,
            path_key: source.path_key.clone(),
            is_map_key: source.is_map_key,
            document_index: source.document_index,
            file_index: source.file_index,
            filename: source.filename.clone(),
            ..Node::default()
        };
        self.insert(node)
    }

    /// Copies a node's attributes and bookkeeping but leaves it without children.
    pub fn copy_without_content(&mut self, id: NodeId) -> NodeId {
        let mut node = self.nodes[id.0].clone();
        node.content = Vec::new();
        self.insert(node)
    }

    /// Recursively copies a subtree. Alias nodes are copied as aliases: the
    /// copy points at the same target and the target is not copied.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut node = self.nodes[id.0].clone();
        let children = std::mem::take(&mut node.content);
        let copy = self.insert(node);
        let mut content = Vec::with_capacity(children.len());
        for child in children {
            let child_copy = self.deep_copy(child);
            self.nodes[child_copy.0].parent = Some(copy);
            content.push(child_copy);
        }
        self.nodes[copy.0].content = content;
        copy
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId, key: PathElement) {
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.path_key = Some(key);
    }

    /// Makes `id` a root again: it forgets its parent and position.
    pub fn detach(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.path_key = None;
    }

    /// Appends an element to a sequence.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.nodes[parent.0].content.len();
        self.nodes[parent.0].content.push(child);
        self.set_parent(child, parent, PathElement::Index(index));
    }

    /// Appends a key/value pair to a mapping.
    pub fn push_entry(&mut self, map: NodeId, key: NodeId, value: NodeId) {
        let name = self.nodes[key.0].value.clone();
        {
            let key_node = &mut self.nodes[key.0];
            key_node.is_map_key = true;
        }
        self.nodes[map.0].content.push(key);
        self.nodes[map.0].content.push(value);
        self.set_parent(key, map, PathElement::Key(name.clone()));
        self.set_parent(value, map, PathElement::Key(name));
    }

    /// Key/value pairs of a mapping, in document order.
    pub fn entries(&self, map: NodeId) -> Vec<(NodeId, NodeId)> {
        self.nodes[map.0]
            .content
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// Looks up the value stored under `key` without following merge keys.
    pub fn map_value(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.entries(map)
            .into_iter()
            .find(|(k, _)| self.nodes[k.0].value == key)
            .map(|(_, v)| v)
    }

    /// Follows alias handles until a non-alias node is reached.
    pub fn resolve_alias(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut hops = 0;
        while let Some(target) = self.nodes[current.0].alias {
            if self.nodes[current.0].kind != Kind::Alias || hops > self.nodes.len() {
                break;
            }
            current = target;
            hops += 1;
        }
        current
    }

    /// Detaches `child` from `parent`. Deleting a map key also removes its
    /// value, and deleting a map value also removes its key.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let node = &mut self.nodes[parent.0];
        let Some(position) = node.content.iter().position(|c| *c == child) else {
            return false;
        };
        match node.kind {
            Kind::Mapping => {
                let start = position - position % 2;
                let end = (start + 2).min(node.content.len());
                node.content.drain(start..end);
                true
            }
            Kind::Sequence => {
                node.content.remove(position);
                self.reindex(parent);
                true
            }
            _ => false,
        }
    }

    fn reindex(&mut self, seq: NodeId) {
        let children = self.nodes[seq.0].content.clone();
        for (index, child) in children.into_iter().enumerate() {
            if self.nodes[child.0].parent == Some(seq) {
                self.nodes[child.0].path_key = Some(PathElement::Index(index));
            }
        }
    }

    /// Path from the document root, recomputed from the parent chain.
    pub fn path(&self, id: NodeId) -> Vec<PathElement> {
        let mut path = Vec::new();
        let mut current = id;
        let mut hops = 0;
        while let Some(parent) = self.nodes[current.0].parent {
            if let Some(key) = &self.nodes[current.0].path_key {
                path.push(key.clone());
            }
            current = parent;
            hops += 1;
            if hops > self.nodes.len() {
                break;
            }
        }
        path.reverse();
        path
    }

    /// Path rendered as `a.b[0]`, for error messages.
    pub fn nice_path(&self, id: NodeId) -> String {
        let mut out = String::new();
        for element in self.path(id) {
            match element {
                PathElement::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(&key);
                }
                PathElement::Index(index) => out.push_str(&format!("[{}]", index)),
            }
        }
        out
    }

    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut hops = 0;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
            hops += 1;
            if hops > self.nodes.len() {
                break;
            }
        }
        current
    }

    /// Finds the first node under `root` (pre-order, aliases not followed)
    /// that defines the anchor `name`.
    pub fn find_anchor(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.anchor == name {
                return Some(id);
            }
            stack.extend(node.content.iter().rev().copied());
        }
        None
    }

    /// Overwrites `target` with the shape and value of `source`. Children of
    /// the source are deep-copied so the two trees never share nodes.
    pub fn update_from(&mut self, target: NodeId, source: NodeId, prefs: &AssignPrefs) {
        if target == source {
            return;
        }
        let (kind, tag, value, style, children) = {
            let src = &self.nodes[source.0];
            (
                src.kind,
                src.tag.clone(),
                src.value.clone(),
                src.style,
                src.content.clone(),
            )
        };
        let copies: Vec<NodeId> = children.into_iter().map(|c| self.deep_copy(c)).collect();
        for copy in &copies {
            self.nodes[copy.0].parent = Some(target);
        }

        let node = &mut self.nodes[target.0];
        if (node.kind != Kind::Scalar && node.content.is_empty()) || node.tag != tag {
            node.style = style;
        }
        node.content = copies;
        node.kind = kind;
        node.value = value;

        self.update_attributes_from(target, source, prefs, CommentsPolicy::SetIfBlank);
    }

    /// Copies kind, tag, alias, anchor, style and comments from `source`
    /// without touching children unless the kind changes.
    pub fn update_attributes_from(
        &mut self,
        target: NodeId,
        source: NodeId,
        prefs: &AssignPrefs,
        comments: CommentsPolicy,
    ) {
        let src = self.nodes[source.0].clone_attributes();
        let node = &mut self.nodes[target.0];

        if node.kind != src.kind {
            node.content.clear();
            node.value.clear();
        }
        node.kind = src.kind;

        if prefs.clobber_custom_tags || node.tag.starts_with("!!") || node.tag.is_empty() {
            node.tag = src.tag;
        }
        node.alias = src.alias;
        if !prefs.dont_overwrite_anchor {
            node.anchor = src.anchor;
        }
        if node.style == Style::Default {
            node.style = src.style;
        }

        comments.apply(&mut node.head_comment, &src.head_comment, "\n");
        comments.apply(&mut node.line_comment, &src.line_comment, " ");
        comments.apply(&mut node.foot_comment, &src.foot_comment, "\n");
    }
}

impl Node {
    fn clone_attributes(&self) -> Node {
        Node {
            kind: self.kind,
            tag: self.tag.clone(),
            style: self.style,
            head_comment: self.head_comment.clone(),
            line_comment: self.line_comment.clone(),
            foot_comment: self.foot_comment.clone(),
            anchor: self.anchor.clone(),
            alias: self.alias,
            ..Node::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(arena: &mut Arena) -> (NodeId, NodeId, NodeId) {
        let root = arena.new_mapping();
        let key = arena.new_str("a");
        let seq = arena.new_sequence();
        arena.push_entry(root, key, seq);
        let one = arena.new_int(1);
        arena.push_child(seq, one);
        (root, seq, one)
    }

    #[test]
    fn test_path_follows_parents() {
        let mut arena = Arena::new();
        let (root, seq, one) = sample(&mut arena);
        assert!(arena.path(root).is_empty());
        assert_eq!(arena.path(seq), vec![PathElement::Key("a".into())]);
        assert_eq!(
            arena.path(one),
            vec![PathElement::Key("a".into()), PathElement::Index(0)]
        );
        assert_eq!(arena.nice_path(one), "a[0]");
    }

    #[test]
    fn test_deep_copy_relinks_alias() {
        let mut arena = Arena::new();
        let target = arena.new_mapping();
        arena.get_mut(target).anchor = "base".into();
        let alias = arena.new_alias(target);
        let holder = arena.new_sequence();
        arena.push_child(holder, alias);

        let before = arena.len();
        let copy = arena.deep_copy(holder);
        // holder and alias only; the anchored map is not duplicated
        assert_eq!(arena.len(), before + 2);
        let copied_alias = arena.get(copy).content[0];
        assert_eq!(arena.get(copied_alias).alias, Some(target));
    }

    #[test]
    fn test_remove_map_value_removes_key() {
        let mut arena = Arena::new();
        let (root, seq, _) = sample(&mut arena);
        assert!(arena.remove_child(root, seq));
        assert!(arena.get(root).content.is_empty());
    }

    #[test]
    fn test_update_from_copies_children() {
        let mut arena = Arena::new();
        let (_, seq, _) = sample(&mut arena);
        let target = arena.new_null();
        arena.update_from(target, seq, &AssignPrefs::default());
        assert_eq!(arena.get(target).kind, Kind::Sequence);
        assert_eq!(arena.get(target).tag, TAG_SEQ);
        assert_eq!(arena.get(target).content.len(), 1);
        assert_ne!(arena.get(target).content[0], arena.get(seq).content[0]);
    }

    #[test]
    fn test_custom_tag_survives_attribute_update() {
        let mut arena = Arena::new();
        let target = arena.new_scalar("!version", "1");
        let source = arena.new_str("2");
        arena.update_from(target, source, &AssignPrefs::default());
        assert_eq!(arena.get(target).tag, "!version");
        assert_eq!(arena.get(target).value, "2");

        let prefs = AssignPrefs {
            clobber_custom_tags: true,
            ..AssignPrefs::default()
        };
        arena.update_from(target, source, &prefs);
        assert_eq!(arena.get(target).tag, TAG_STR);
    }
}
