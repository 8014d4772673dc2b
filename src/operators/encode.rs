use crate::ast::expressions::ExpressionNode;
use crate::ast::operators::ENCODE_WITH_INDENT;
use crate::ast::preferences::{EncodeFormat, EncodePrefs, Prefs};
use crate::context::Context;
use crate::convert;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, TAG_STR};
use crate::output;

use super::{describe, int_arg};

/// `to_json`, `to_json(n)`, `@json`, `@csv` and `@tsv`.
pub fn encode(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = match &expr.operation.prefs {
        Prefs::Encode(prefs) => *prefs,
        _ => EncodePrefs::default(),
    };
    let mut results = Vec::new();
    for id in &context.matches {
        let indent = if expr.is(&ENCODE_WITH_INDENT) {
            int_arg(evaluator, context, *id, expr.rhs(), "to_json")?.max(0) as usize
        } else {
            prefs.indent
        };
        let arena = evaluator.arena_mut();
        let text = match prefs.format {
            EncodeFormat::Json => output::encode_json(arena, *id, indent),
            EncodeFormat::Csv => delimited(arena, *id, ',')?,
            EncodeFormat::Tsv => delimited(arena, *id, '\t')?,
        };
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_STR, text));
    }
    Ok(context.child(results))
}

/// A sequence of scalars is one row; a sequence of sequences is many.
fn delimited(arena: &Arena, id: NodeId, separator: char) -> Result<String, EvalError> {
    let target = arena.resolve_alias(id);
    let node = arena.get(target);
    if node.kind != Kind::Sequence {
        return Err(EvalError::TypeError(format!(
            "cannot encode {} as a delimited row, expected a sequence",
            describe(arena, id)
        )));
    }
    let nested = node
        .content
        .iter()
        .any(|item| arena.get(arena.resolve_alias(*item)).kind == Kind::Sequence);
    if !nested {
        return row(arena, &node.content, separator);
    }
    let mut rows = Vec::new();
    for item in &node.content {
        let line = arena.resolve_alias(*item);
        if arena.get(line).kind != Kind::Sequence {
            return Err(EvalError::TypeError(format!(
                "cannot mix rows and cells, got {}",
                describe(arena, *item)
            )));
        }
        rows.push(row(arena, &arena.get(line).content, separator)?);
    }
    Ok(rows.join("\n"))
}

fn row(arena: &Arena, cells: &[NodeId], separator: char) -> Result<String, EvalError> {
    let mut out = Vec::new();
    for cell in cells {
        let node = arena.get(arena.resolve_alias(*cell));
        if node.kind != Kind::Scalar {
            return Err(EvalError::TypeError(format!(
                "cells must be scalars, got {}",
                describe(arena, *cell)
            )));
        }
        let text = if node.is_null() { "" } else { node.value.as_str() };
        out.push(if separator == '\t' {
            tsv_cell(text)
        } else {
            csv_cell(text)
        });
    }
    Ok(out.join(&separator.to_string()))
}

fn csv_cell(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn tsv_cell(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// `from_json`: parses each match's text into a new document.
pub fn decode(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let text = arena.get(arena.resolve_alias(*id)).value.clone();
        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            EvalError::TypeError(format!("cannot decode {} as JSON: {}", describe(arena, *id), err))
        })?;
        results.push(convert::from_json(arena, &parsed));
    }
    Ok(context.child(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_quotes_when_needed() {
        assert_eq!(csv_cell("plain"), "plain");
        assert_eq!(csv_cell("a,b"), "\"a,b\"");
        assert_eq!(csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_tsv_escapes() {
        assert_eq!(tsv_cell("a\tb\nc"), "a\\tb\\nc");
    }

    #[test]
    fn test_rows() {
        let mut arena = Arena::new();
        let table = convert::from_json(&mut arena, &json!([["a", 1], ["b,c", null]]));
        assert_eq!(delimited(&arena, table, ',').unwrap(), "a,1\n\"b,c\",");
        let single = convert::from_json(&mut arena, &json!(["x", true]));
        assert_eq!(delimited(&arena, single, '\t').unwrap(), "x\ttrue");
    }

    #[test]
    fn test_maps_are_not_rows() {
        let mut arena = Arena::new();
        let map = convert::from_json(&mut arena, &json!({"a": 1}));
        assert!(matches!(delimited(&arena, map, ','), Err(EvalError::TypeError(_))));
        let nested = convert::from_json(&mut arena, &json!([[{"a": 1}]]));
        assert!(delimited(&arena, nested, ',').is_err());
    }
}
