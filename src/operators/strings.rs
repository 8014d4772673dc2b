//! String operators. Regex operators take an optional flags argument:
//! `g` for every match, `i` for case-insensitive, plus `x`, `s` and `m`.

use regex::{Regex, RegexBuilder};

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, Kind, NodeId, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STR};
use crate::value;

use super::{block_parts, describe, string_arg};

/// Text of a string operand, or a type error naming the operator.
fn text_of(arena: &Arena, id: NodeId, operator: &str) -> Result<String, EvalError> {
    let target = arena.resolve_alias(id);
    let node = arena.get(target);
    if node.kind != Kind::Scalar || node.effective_tag() != TAG_STR {
        return Err(EvalError::TypeError(format!(
            "{} only works on strings, got {}",
            operator,
            describe(arena, id)
        )));
    }
    Ok(node.value.clone())
}

struct Pattern {
    regex: Regex,
    global: bool,
}

fn compile(source: &str, flags: &str) -> Result<Pattern, EvalError> {
    let regex = RegexBuilder::new(source)
        .case_insensitive(flags.contains('i'))
        .ignore_whitespace(flags.contains('x'))
        .dot_matches_new_line(flags.contains('s'))
        .multi_line(flags.contains('m'))
        .build()
        .map_err(|err| EvalError::TypeError(format!("invalid regex '{}': {}", source, err)))?;
    Ok(Pattern {
        regex,
        global: flags.contains('g'),
    })
}

fn pattern_arg(
    evaluator: &mut Evaluator,
    context: &Context,
    id: NodeId,
    regex: Option<&ExpressionNode>,
    flags: Option<&ExpressionNode>,
    operator: &str,
) -> Result<Pattern, EvalError> {
    let source = string_arg(evaluator, context, id, regex, operator)?;
    let flags = match flags {
        Some(_) => string_arg(evaluator, context, id, flags, operator)?,
        None => String::new(),
    };
    compile(&source, &flags)
}

fn string_node(arena: &mut Arena, text: impl Into<String>) -> NodeId {
    arena.new_str(text)
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

pub fn join(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let separator = string_arg(evaluator, context, *id, expr.rhs(), "join")?;
        let arena = evaluator.arena_mut();
        let seq = super::expect_sequence(arena, *id, "join")?;
        let mut parts = Vec::new();
        for element in &arena.get(seq).content {
            let node = arena.get(arena.resolve_alias(*element));
            if node.kind != Kind::Scalar {
                return Err(EvalError::TypeError(format!(
                    "cannot join with {}",
                    describe(arena, *element)
                )));
            }
            parts.push(if node.tag == TAG_NULL { String::new() } else { node.value.clone() });
        }
        let joined = parts.join(&separator);
        results.push(string_node(arena, joined));
    }
    Ok(context.child(results))
}

pub fn split(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let separator = string_arg(evaluator, context, *id, expr.rhs(), "split")?;
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        if arena.get(target).is_null() {
            continue;
        }
        let text = text_of(arena, *id, "split")?;
        let parts: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str()).map(String::from).collect()
        };
        let seq = arena.new_sequence();
        for part in parts {
            let item = string_node(arena, part);
            arena.push_child(seq, item);
        }
        results.push(seq);
    }
    Ok(context.child(results))
}

/// `test(re)` / `test(re; flags)`
pub fn test(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (regex, flags) = block_parts(expr.rhs());
    let mut results = Vec::new();
    for id in &context.matches {
        let pattern = pattern_arg(evaluator, context, *id, regex, flags, "test")?;
        let text = text_of(evaluator.arena(), *id, "test")?;
        results.push(evaluator.arena_mut().new_bool(pattern.regex.is_match(&text)));
    }
    Ok(context.child(results))
}

fn match_node(
    arena: &mut Arena,
    pattern: &Pattern,
    text: &str,
    captures: &regex::Captures,
) -> NodeId {
    let map = arena.new_mapping();
    let whole = captures.get(0);
    let (start, end) = whole.map(|m| (m.start(), m.end())).unwrap_or((0, 0));
    push_field(arena, map, "string", |a| a.new_str(&text[start..end]));
    push_field(arena, map, "offset", |a| a.new_int(char_offset(text, start) as i64));
    push_field(arena, map, "length", |a| a.new_int(text[start..end].chars().count() as i64));

    let groups = arena.new_sequence();
    for (index, name) in pattern.regex.capture_names().enumerate().skip(1) {
        let group = arena.new_mapping();
        match captures.get(index) {
            Some(m) => {
                push_field(arena, group, "string", |a| a.new_str(m.as_str()));
                push_field(arena, group, "offset", |a| {
                    a.new_int(char_offset(text, m.start()) as i64)
                });
                push_field(arena, group, "length", |a| {
                    a.new_int(m.as_str().chars().count() as i64)
                });
            }
            None => {
                push_field(arena, group, "string", Arena::new_null);
                push_field(arena, group, "offset", |a| a.new_int(-1));
                push_field(arena, group, "length", |a| a.new_int(0));
            }
        }
        push_field(arena, group, "name", |a| match name {
            Some(name) => a.new_str(name),
            None => a.new_null(),
        });
        arena.push_child(groups, group);
    }
    let key = arena.new_str("captures");
    arena.push_entry(map, key, groups);
    map
}

fn push_field(arena: &mut Arena, map: NodeId, name: &str, make: impl FnOnce(&mut Arena) -> NodeId) {
    let key = arena.new_str(name);
    let value = make(arena);
    arena.push_entry(map, key, value);
}

/// `match(re)`: one map per match with its text, offset, length and groups.
pub fn match_regex(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (regex, flags) = block_parts(expr.rhs());
    let mut results = Vec::new();
    for id in &context.matches {
        let pattern = pattern_arg(evaluator, context, *id, regex, flags, "match")?;
        let text = text_of(evaluator.arena(), *id, "match")?;
        let arena = evaluator.arena_mut();
        for captures in pattern.regex.captures_iter(&text) {
            results.push(match_node(arena, &pattern, &text, &captures));
            if !pattern.global {
                break;
            }
        }
    }
    Ok(context.child(results))
}

/// `capture(re)`: named groups of each match as a map.
pub fn capture(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (regex, flags) = block_parts(expr.rhs());
    let mut results = Vec::new();
    for id in &context.matches {
        let pattern = pattern_arg(evaluator, context, *id, regex, flags, "capture")?;
        let text = text_of(evaluator.arena(), *id, "capture")?;
        let arena = evaluator.arena_mut();
        for captures in pattern.regex.captures_iter(&text) {
            let map = arena.new_mapping();
            for name in pattern.regex.capture_names().flatten() {
                push_field(arena, map, name, |a| match captures.name(name) {
                    Some(m) => a.new_str(m.as_str()),
                    None => a.new_null(),
                });
            }
            results.push(map);
            if !pattern.global {
                break;
            }
        }
    }
    Ok(context.child(results))
}

/// `sub(re; replacement)` / `sub(re; replacement; flags)`. Every match is
/// replaced; the replacement may refer to groups as `${name}` or `$1`.
pub fn sub(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (regex, rest) = block_parts(expr.rhs());
    if rest.is_none() {
        return Err(EvalError::ArityError("sub expects sub(regex; replacement)".to_string()));
    }
    let (replacement, flags) = block_parts(rest);

    let mut results = Vec::new();
    for id in &context.matches {
        let pattern = pattern_arg(evaluator, context, *id, regex, flags, "sub")?;
        let with = string_arg(evaluator, context, *id, replacement, "sub")?;
        let text = text_of(evaluator.arena(), *id, "sub")?;
        let replaced = pattern.regex.replace_all(&text, with.as_str()).into_owned();
        let arena = evaluator.arena_mut();
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_STR, replaced));
    }
    Ok(context.child(results))
}

fn map_text(
    evaluator: &mut Evaluator,
    context: &Context,
    operator: &str,
    f: fn(&str) -> String,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let text = text_of(arena, *id, operator)?;
        let source = arena.resolve_alias(*id);
        let tag = arena.get(source).tag.clone();
        results.push(arena.create_replacement(*id, Kind::Scalar, &tag, f(&text)));
    }
    Ok(context.child(results))
}

pub fn upcase(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    map_text(evaluator, context, "upcase", str::to_uppercase)
}

pub fn downcase(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    map_text(evaluator, context, "downcase", str::to_lowercase)
}

pub fn trim(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    map_text(evaluator, context, "trim", |text| text.trim().to_string())
}

/// Scalars become their text; collections become compact JSON.
pub fn to_string(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        let text = match arena.get(target).kind {
            Kind::Scalar => arena.get(target).value.clone(),
            _ => crate::output::encode_json(arena, target, 0),
        };
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_STR, text));
    }
    Ok(context.child(results))
}

pub fn to_number(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let target = arena.resolve_alias(*id);
        let node = arena.get(target);
        let text = node.value.trim().to_string();
        let tag = match node.effective_tag() {
            TAG_INT => TAG_INT,
            TAG_FLOAT => TAG_FLOAT,
            _ if node.kind == Kind::Scalar => match value::classify_number(&text) {
                Some(tag) => tag,
                None => {
                    return Err(EvalError::TypeError(format!(
                        "cannot convert '{}' ({}) to a number",
                        node.value,
                        arena.nice_path(*id)
                    )));
                }
            },
            _ => {
                return Err(EvalError::TypeError(format!(
                    "cannot convert {} to a number",
                    describe(arena, *id)
                )));
            }
        };
        results.push(arena.create_replacement(*id, Kind::Scalar, tag, text));
    }
    Ok(context.child(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let pattern = compile("CAT", "gi").unwrap();
        assert!(pattern.global);
        assert!(pattern.regex.is_match("a cat"));
    }

    #[test]
    fn test_bad_regex_is_type_error() {
        assert!(matches!(compile("(", ""), Err(EvalError::TypeError(_))));
    }

    #[test]
    fn test_offsets_count_chars() {
        assert_eq!(char_offset("héllo", 3), 2);
    }
}
