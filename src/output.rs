//! JSON output for evaluation results.
//!
//! This module writes node trees as JSON in either compact or indented
//! form. Map keys keep document order, integers written in hex, octal or
//! binary are printed in decimal, and non-finite floats (which JSON cannot
//! express) are printed as strings.
//!
//! # Examples
//!
//! ```
//! use tansy_lang::node::Arena;
//! use tansy_lang::output::encode_json;
//!
//! let mut arena = Arena::new();
//! let map = arena.new_mapping();
//! let key = arena.new_str("answer");
//! let value = arena.new_int(42);
//! arena.push_entry(map, key, value);
//!
//! assert_eq!(encode_json(&arena, map, 0), r#"{"answer":42}"#);
//! assert_eq!(encode_json(&arena, map, 2), "{\n  \"answer\": 42\n}");
//! ```

use crate::convert;
use crate::node::{Arena, Kind, NodeId};
use crate::pipeline::Printer;

pub struct JsonPrinter {
    /// Spaces per nesting level; 0 prints compact JSON
    indent: usize,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter {
            indent: if pretty { 2 } else { 0 },
        }
    }

    pub fn with_indent(indent: usize) -> Self {
        JsonPrinter { indent }
    }

    pub fn print_node(&self, arena: &Arena, id: NodeId) -> String {
        self.print_value(arena, id, 0, &mut Vec::new())
    }

    fn print_value(
        &self,
        arena: &Arena,
        id: NodeId,
        level: usize,
        visiting: &mut Vec<NodeId>,
    ) -> String {
        let target = arena.resolve_alias(id);
        if target != id && visiting.contains(&target) {
            return format!("\"*{}\"", self.escape_string(&arena.get(id).value));
        }
        visiting.push(target);
        let printed = match arena.get(target).kind {
            Kind::Sequence => self.print_array(arena, target, level, visiting),
            Kind::Mapping => self.print_object(arena, target, level, visiting),
            Kind::Scalar | Kind::Alias => match convert::to_json(arena, target) {
                serde_json::Value::String(s) => format!("\"{}\"", self.escape_string(&s)),
                other => other.to_string(),
            },
        };
        visiting.pop();
        printed
    }

    fn print_array(
        &self,
        arena: &Arena,
        seq: NodeId,
        level: usize,
        visiting: &mut Vec<NodeId>,
    ) -> String {
        let items = &arena.get(seq).content;
        if items.is_empty() {
            return "[]".to_string();
        }

        if self.indent > 0 {
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    format!(
                        "{}{}",
                        self.pad(level + 1),
                        self.print_value(arena, *item, level + 1, visiting)
                    )
                })
                .collect();
            format!("[\n{}\n{}]", lines.join(",\n"), self.pad(level))
        } else {
            let items: Vec<String> = items
                .iter()
                .map(|item| self.print_value(arena, *item, level, visiting))
                .collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(
        &self,
        arena: &Arena,
        map: NodeId,
        level: usize,
        visiting: &mut Vec<NodeId>,
    ) -> String {
        let entries = arena.entries(map);
        if entries.is_empty() {
            return "{}".to_string();
        }

        if self.indent > 0 {
            let lines: Vec<String> = entries
                .iter()
                .map(|(key, item)| {
                    format!(
                        "{}\"{}\": {}",
                        self.pad(level + 1),
                        self.escape_string(&arena.get(*key).value),
                        self.print_value(arena, *item, level + 1, visiting)
                    )
                })
                .collect();
            format!("{{\n{}\n{}}}", lines.join(",\n"), self.pad(level))
        } else {
            let items: Vec<String> = entries
                .iter()
                .map(|(key, item)| {
                    format!(
                        "\"{}\":{}",
                        self.escape_string(&arena.get(*key).value),
                        self.print_value(arena, *item, level, visiting)
                    )
                })
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn pad(&self, level: usize) -> String {
        " ".repeat(self.indent * level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

impl Printer for JsonPrinter {
    /// One JSON text per result, newline separated.
    fn print(&self, arena: &Arena, results: &[NodeId]) -> String {
        results
            .iter()
            .map(|id| self.print_node(arena, *id))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// JSON text of one node with `indent` spaces per level (0 for compact).
pub fn encode_json(arena: &Arena, id: NodeId, indent: usize) -> String {
    JsonPrinter::with_indent(indent).print_node(arena, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TAG_INT;

    #[test]
    fn test_hex_prints_as_decimal() {
        let mut arena = Arena::new();
        let n = arena.new_scalar(TAG_INT, "0xFF");
        assert_eq!(encode_json(&arena, n, 0), "255");
    }

    #[test]
    fn test_escapes() {
        let mut arena = Arena::new();
        let s = arena.new_str("a\"b\n");
        assert_eq!(encode_json(&arena, s, 0), r#""a\"b\n""#);
    }

    #[test]
    fn test_nested_pretty() {
        let mut arena = Arena::new();
        let seq = arena.new_sequence();
        let inner = arena.new_sequence();
        let one = arena.new_int(1);
        arena.push_child(inner, one);
        arena.push_child(seq, inner);
        assert_eq!(encode_json(&arena, seq, 2), "[\n  [\n    1\n  ]\n]");
    }

    #[test]
    fn test_infinity_is_a_string() {
        let mut arena = Arena::new();
        let inf = arena.new_float(f64::INFINITY);
        assert_eq!(JsonPrinter::new(false).print(&arena, &[inf]), "\".inf\"");
    }
}
