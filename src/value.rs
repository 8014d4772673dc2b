//! Scalar text interpretation.
//!
//! Document scalars are stored as text plus a tag. The helpers here turn
//! that text into numbers and booleans, format arithmetic results back into
//! text, and define the total order used by sorting and `min`/`max`.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::node::{Arena, Kind, Node, NodeId, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_STR};

/// How an integer literal was written, so results keep the input's base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntFormat {
    Decimal,
    Hex,
    Octal,
    Binary,
}

pub fn parse_int(text: &str) -> Option<(IntFormat, i64)> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (format, radix, body) = if let Some(body) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (IntFormat::Hex, 16, body)
    } else if let Some(body) = digits.strip_prefix("0o") {
        (IntFormat::Octal, 8, body)
    } else if let Some(body) = digits.strip_prefix("0b") {
        (IntFormat::Binary, 2, body)
    } else {
        (IntFormat::Decimal, 10, digits)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(body, radix).ok()?;
    Some((format, if negative { -magnitude } else { magnitude }))
}

pub fn format_int(format: IntFormat, n: i64) -> String {
    let sign = if n < 0 { "-" } else { "" };
    let magnitude = n.unsigned_abs();
    match format {
        IntFormat::Decimal => n.to_string(),
        IntFormat::Hex => format!("{}0x{:X}", sign, magnitude),
        IntFormat::Octal => format!("{}0o{:o}", sign, magnitude),
        IntFormat::Binary => format!("{}0b{:b}", sign, magnitude),
    }
}

pub fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | "+.inf" | ".Inf" | ".INF" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Some(f64::NAN),
        _ => {}
    }
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some((_, n)) = parse_int(text) {
        return Some(n as f64);
    }
    f64::from_str(text).ok()
}

pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f == f64::INFINITY {
        ".inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-.inf".to_string()
    } else {
        f.to_string()
    }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Tag of a number literal as written in an expression, or `None` when the
/// text is not a number.
pub fn classify_number(text: &str) -> Option<&'static str> {
    if parse_int(text).is_some() {
        return Some(TAG_INT);
    }
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("inf") || lowered.contains("nan") {
        return None;
    }
    f64::from_str(text).ok().map(|_| TAG_FLOAT)
}

/// Tag a plain scalar would resolve to, used for untagged and custom-tagged values.
pub fn guess_tag(text: &str) -> &'static str {
    if matches!(text, "null" | "Null" | "NULL" | "~") {
        TAG_NULL
    } else if parse_bool(text).is_some() {
        TAG_BOOL
    } else if parse_int(text).is_some() {
        TAG_INT
    } else if classify_number(text).is_some() || parse_float(text).is_some_and(|f| !f.is_finite())
    {
        TAG_FLOAT
    } else {
        TAG_STR
    }
}

/// Exact decimal view of a numeric scalar. Floats outside the decimal range
/// (including infinities and NaN) have no decimal view.
pub fn to_decimal(text: &str) -> Option<Decimal> {
    if let Some((_, n)) = parse_int(text) {
        return Some(Decimal::from(n));
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
        .or_else(|| parse_float(text).and_then(Decimal::from_f64))
}

/// Formats a decimal result the way float results are written back.
pub fn format_decimal(d: Decimal) -> String {
    let normalized = d.normalize();
    if normalized.is_integer() {
        match normalized.to_i64() {
            Some(n) => n.to_string(),
            None => normalized.to_string(),
        }
    } else {
        normalized.to_string()
    }
}

/// Numeric value of a scalar node, if its tag says it is a number.
pub fn number_of(node: &Node) -> Option<f64> {
    match node.effective_tag() {
        TAG_INT => parse_int(&node.value).map(|(_, n)| n as f64),
        TAG_FLOAT => parse_float(&node.value),
        _ => None,
    }
}

fn rank(node: &Node) -> u8 {
    match node.kind {
        Kind::Scalar => match node.effective_tag() {
            TAG_NULL => 0,
            TAG_BOOL => 1,
            TAG_INT | TAG_FLOAT => 2,
            TAG_STR => 3,
            _ => 4,
        },
        Kind::Sequence => 5,
        Kind::Mapping => 6,
        Kind::Alias => 7,
    }
}

/// Total order over floats with NaN below every other number.
pub fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Total order over nodes: null, booleans, numbers, strings, other scalars,
/// sequences, then mappings. Collections of the same kind compare by size.
pub fn compare_nodes(arena: &Arena, a: NodeId, b: NodeId) -> Ordering {
    let left = arena.get(arena.resolve_alias(a));
    let right = arena.get(arena.resolve_alias(b));

    let by_rank = rank(left).cmp(&rank(right));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match rank(left) {
        1 => parse_bool(&left.value).cmp(&parse_bool(&right.value)),
        2 => {
            let l = number_of(left).unwrap_or(f64::NAN);
            let r = number_of(right).unwrap_or(f64::NAN);
            compare_floats(l, r)
        }
        3 | 4 => left.value.cmp(&right.value),
        5 | 6 => left.content.len().cmp(&right.content.len()),
        _ => Ordering::Equal,
    }
}

/// Structural equality, ignoring styles and comments.
pub fn deep_equal(arena: &Arena, a: NodeId, b: NodeId) -> bool {
    let left = arena.get(arena.resolve_alias(a));
    let right = arena.get(arena.resolve_alias(b));

    match (left.kind, right.kind) {
        (Kind::Scalar, Kind::Scalar) => scalars_equal(left, right),
        (Kind::Sequence, Kind::Sequence) => {
            left.content.len() == right.content.len()
                && left
                    .content
                    .iter()
                    .zip(&right.content)
                    .all(|(x, y)| deep_equal(arena, *x, *y))
        }
        (Kind::Mapping, Kind::Mapping) => {
            let left_entries = arena.entries(arena.resolve_alias(a));
            let right_entries = arena.entries(arena.resolve_alias(b));
            left_entries.len() == right_entries.len()
                && left_entries.iter().all(|(key, value)| {
                    right_entries.iter().any(|(other_key, other_value)| {
                        arena.get(*key).value == arena.get(*other_key).value
                            && deep_equal(arena, *value, *other_value)
                    })
                })
        }
        _ => false,
    }
}

pub fn scalars_equal(left: &Node, right: &Node) -> bool {
    let left_tag = left.effective_tag();
    let right_tag = right.effective_tag();
    if left_tag == TAG_NULL || right_tag == TAG_NULL {
        return left_tag == right_tag;
    }
    if let (Some(l), Some(r)) = (number_of(left), number_of(right)) {
        return l == r;
    }
    left.value == right.value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_formats() {
        assert_eq!(parse_int("42"), Some((IntFormat::Decimal, 42)));
        assert_eq!(parse_int("0xFF"), Some((IntFormat::Hex, 255)));
        assert_eq!(parse_int("0o17"), Some((IntFormat::Octal, 15)));
        assert_eq!(parse_int("-12"), Some((IntFormat::Decimal, -12)));
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn test_format_int_keeps_base() {
        assert_eq!(format_int(IntFormat::Hex, 255), "0xFF");
        assert_eq!(format_int(IntFormat::Octal, 8), "0o10");
        assert_eq!(format_int(IntFormat::Decimal, -3), "-3");
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(parse_float(".inf"), Some(f64::INFINITY));
        assert!(parse_float(".nan").is_some_and(f64::is_nan));
        assert_eq!(format_float(f64::NEG_INFINITY), "-.inf");
        assert_eq!(format_float(2.5), "2.5");
    }

    #[test]
    fn test_guess_tag() {
        assert_eq!(guess_tag("1.2"), TAG_FLOAT);
        assert_eq!(guess_tag("12"), TAG_INT);
        assert_eq!(guess_tag("true"), TAG_BOOL);
        assert_eq!(guess_tag("~"), TAG_NULL);
        assert_eq!(guess_tag("cat"), TAG_STR);
    }

    #[test]
    fn test_decimal_formatting() {
        let sum = to_decimal("0.1").unwrap() + to_decimal("0.2").unwrap();
        assert_eq!(format_decimal(sum), "0.3");
        assert_eq!(format_decimal(to_decimal("1.50").unwrap()), "1.5");
        assert_eq!(format_decimal(to_decimal("3.0").unwrap()), "3");
        assert_eq!(to_decimal("1e3"), Some(Decimal::from(1000)));
    }

    #[test]
    fn test_total_order() {
        let mut arena = Arena::new();
        let null = arena.new_null();
        let flag = arena.new_bool(true);
        let one = arena.new_int(1);
        let half = arena.new_float(0.5);
        let text = arena.new_str("a");
        assert_eq!(compare_nodes(&arena, null, flag), Ordering::Less);
        assert_eq!(compare_nodes(&arena, flag, half), Ordering::Less);
        assert_eq!(compare_nodes(&arena, half, one), Ordering::Less);
        assert_eq!(compare_nodes(&arena, one, text), Ordering::Less);
    }

    #[test]
    fn test_nan_sorts_below_numbers() {
        let mut arena = Arena::new();
        let mut ids = vec![arena.new_int(3), arena.new_float(f64::NAN), arena.new_int(-1)];
        ids.push(arena.new_float(f64::NAN));
        ids.sort_by(|a, b| compare_nodes(&arena, *a, *b));
        let values: Vec<&str> = ids.iter().map(|id| arena.get(*id).value.as_str()).collect();
        assert_eq!(values, vec![".nan", ".nan", "-1", "3"]);
        assert_eq!(compare_floats(f64::NAN, f64::NEG_INFINITY), Ordering::Less);
    }

    #[test]
    fn test_numeric_equality_across_tags() {
        let mut arena = Arena::new();
        let int = arena.new_int(2);
        let float = arena.new_scalar(TAG_FLOAT, "2.0");
        assert!(deep_equal(&arena, int, float));
    }
}
