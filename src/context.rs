use std::collections::HashMap;

use crate::node::NodeId;

/// The stream flowing between operators.
///
/// Besides the current matches a context carries the variable bindings in
/// scope and whether traversal may create missing keys. Handlers never
/// mutate their input context; they build a child instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub matches: Vec<NodeId>,
    pub variables: HashMap<String, Vec<NodeId>>,
    /// Read-only contexts never auto-create keys or sequence slots
    pub dont_auto_create: bool,
    /// Layout set by `with_dtf`, overriding the configured default
    pub date_time_layout: Option<String>,
}

impl Context {
    /// A read-only top-level context over `matches`. Only write targets
    /// (assignment left sides, `with`, `setpath`) switch to writable.
    pub fn new(matches: Vec<NodeId>) -> Self {
        Context {
            matches,
            dont_auto_create: true,
            ..Context::default()
        }
    }

    /// Same scope and flags, different matches.
    pub fn child(&self, matches: Vec<NodeId>) -> Self {
        Context {
            matches,
            variables: self.variables.clone(),
            dont_auto_create: self.dont_auto_create,
            date_time_layout: self.date_time_layout.clone(),
        }
    }

    pub fn single_child(&self, id: NodeId) -> Self {
        self.child(vec![id])
    }

    pub fn single_readonly_child(&self, id: NodeId) -> Self {
        self.single_child(id).readonly()
    }

    pub fn readonly(mut self) -> Self {
        self.dont_auto_create = true;
        self
    }

    pub fn writable(mut self) -> Self {
        self.dont_auto_create = false;
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Vec<NodeId>> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Vec<NodeId>) {
        self.variables.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.matches.first().copied()
    }
}
