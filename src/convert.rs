//! JSON <-> node conversion utilities

use log::debug;
use serde_json::{Deserializer, Number, Value};

use crate::evaluator::EvalError;
use crate::node::{Arena, Kind, NodeId, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL};
use crate::pipeline::Decoder;
use crate::value;

/// Decodes a stream of JSON documents (whitespace separated) into the arena.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    filename: String,
    file_index: usize,
}

impl JsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks decoded nodes as coming from `filename`, the `file_index`-th input.
    pub fn with_file(mut self, filename: impl Into<String>, file_index: usize) -> Self {
        self.filename = filename.into();
        self.file_index = file_index;
        self
    }
}

impl Decoder for JsonDecoder {
    fn decode(&self, arena: &mut Arena, input: &str) -> Result<Vec<NodeId>, EvalError> {
        let mut documents = Vec::new();
        for (index, document) in Deserializer::from_str(input).into_iter::<Value>().enumerate() {
            let document = document.map_err(|err| {
                EvalError::IoError(format!("invalid JSON in document {}: {}", index, err))
            })?;
            let root = from_json(arena, &document);
            stamp(arena, root, index, &self.filename, self.file_index);
            documents.push(root);
        }
        debug!("decoded {} JSON document(s)", documents.len());
        Ok(documents)
    }
}

fn stamp(arena: &mut Arena, id: NodeId, document_index: usize, filename: &str, file_index: usize) {
    let node = arena.get_mut(id);
    node.document_index = document_index;
    node.file_index = file_index;
    node.filename = filename.to_string();
    for child in arena.get(id).content.clone() {
        stamp(arena, child, document_index, filename, file_index);
    }
}

/// Convert serde_json::Value to a node tree
pub fn from_json(arena: &mut Arena, v: &Value) -> NodeId {
    match v {
        Value::Null => arena.new_null(),
        Value::Bool(b) => arena.new_bool(*b),
        Value::Number(n) => {
            let tag = if n.is_i64() || n.is_u64() { TAG_INT } else { TAG_FLOAT };
            arena.new_scalar(tag, n.to_string())
        }
        Value::String(s) => arena.new_str(s.clone()),
        Value::Array(items) => {
            let seq = arena.new_sequence();
            for item in items {
                let child = from_json(arena, item);
                arena.push_child(seq, child);
            }
            seq
        }
        Value::Object(entries) => {
            let map = arena.new_mapping();
            for (key, item) in entries {
                let key_node = arena.new_str(key.clone());
                let child = from_json(arena, item);
                arena.push_entry(map, key_node, child);
            }
            map
        }
    }
}

/// Convert a node tree to serde_json::Value. Aliases are followed; an alias
/// that leads back into its own ancestry is written as `*name`.
pub fn to_json(arena: &Arena, id: NodeId) -> Value {
    to_json_guarded(arena, id, &mut Vec::new())
}

fn scalar_to_json(arena: &Arena, id: NodeId) -> Value {
    let node = arena.get(id);
    match node.effective_tag() {
        TAG_NULL => Value::Null,
        TAG_BOOL => value::parse_bool(&node.value)
            .map(Value::Bool)
            .unwrap_or_else(|| Value::String(node.value.clone())),
        TAG_INT => match value::parse_int(&node.value) {
            Some((_, n)) => Value::Number(n.into()),
            None => Value::String(node.value.clone()),
        },
        TAG_FLOAT => node
            .value
            .parse::<i64>()
            .ok()
            .map(Number::from)
            .or_else(|| value::parse_float(&node.value).and_then(Number::from_f64))
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(node.value.clone())),
        _ => Value::String(node.value.clone()),
    }
}

fn to_json_guarded(arena: &Arena, id: NodeId, visiting: &mut Vec<NodeId>) -> Value {
    let target = arena.resolve_alias(id);
    if target != id && visiting.contains(&target) {
        return Value::String(format!("*{}", arena.get(id).value));
    }
    visiting.push(target);
    let node = arena.get(target);
    let result = match node.kind {
        Kind::Scalar | Kind::Alias => scalar_to_json(arena, target),
        Kind::Sequence => Value::Array(
            node.content
                .iter()
                .map(|child| to_json_guarded(arena, *child, visiting))
                .collect(),
        ),
        Kind::Mapping => Value::Object(
            arena
                .entries(target)
                .into_iter()
                .map(|(key, item)| {
                    (arena.get(key).value.clone(), to_json_guarded(arena, item, visiting))
                })
                .collect(),
        ),
    };
    visiting.pop();
    result
}
