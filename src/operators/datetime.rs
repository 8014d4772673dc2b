//! Date and time operators.
//!
//! Timestamps are plain scalars read and written with a strftime-style
//! layout. The layout comes from the innermost `with_dtf` or, failing that,
//! from [`crate::config::Config::date_time_layout`].

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use log::trace;

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Kind, TAG_FLOAT, TAG_INT, TAG_STR, TAG_TIMESTAMP};
use crate::value;

use super::{block_parts, describe, first_result, string_arg};

/// Parses `text` with `layout`, then as RFC 3339, then as a zone-less
/// date-time or date (taken as UTC).
pub(crate) fn parse_datetime(text: &str, layout: &str) -> Result<DateTime<FixedOffset>, EvalError> {
    if let Ok(parsed) = DateTime::parse_from_str(text, layout) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
        return Ok(naive.and_utc().fixed_offset());
    }
    let date = NaiveDate::parse_from_str(text, layout)
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0));
    match date {
        Some(naive) => Ok(naive.and_utc().fixed_offset()),
        None => Err(EvalError::TypeError(format!(
            "cannot parse '{}' as a date-time with layout '{}'",
            text, layout
        ))),
    }
}

/// Formats through `write!` so a bad layout is an error instead of a panic.
pub(crate) fn format_with(
    datetime: &DateTime<FixedOffset>,
    layout: &str,
) -> Result<String, EvalError> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(layout))
        .map_err(|_| EvalError::TypeError(format!("invalid date-time layout '{}'", layout)))?;
    Ok(out)
}

pub fn now(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let layout = evaluator.date_time_layout(context);
    let text = format_with(&Utc::now().fixed_offset(), &layout)?;
    let arena = evaluator.arena_mut();
    Ok(context.single_child(arena.new_scalar(TAG_TIMESTAMP, text)))
}

/// `format_datetime(layout)`: re-renders each timestamp with another layout.
pub fn format_datetime(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let layout = evaluator.date_time_layout(context);
    let mut results = Vec::new();
    for id in &context.matches {
        let target_layout = string_arg(evaluator, context, *id, expr.rhs(), "format_datetime")?;
        let arena = evaluator.arena_mut();
        let parsed = parse_datetime(&arena.get(arena.resolve_alias(*id)).value, &layout)?;
        let text = format_with(&parsed, &target_layout)?;
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_STR, text));
    }
    Ok(context.child(results))
}

/// `to_unix`: seconds since the epoch, fractional when sub-second.
pub fn to_unix(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let layout = evaluator.date_time_layout(context);
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let parsed = parse_datetime(&arena.get(arena.resolve_alias(*id)).value, &layout)?;
        let nanos = parsed.timestamp_subsec_nanos();
        let (tag, text) = if nanos == 0 {
            (TAG_INT, parsed.timestamp().to_string())
        } else {
            let seconds = parsed.timestamp() as f64 + f64::from(nanos) / 1e9;
            (TAG_FLOAT, value::format_float(seconds))
        };
        results.push(arena.create_replacement(*id, Kind::Scalar, tag, text));
    }
    Ok(context.child(results))
}

/// `from_unix`: an epoch number rendered as a UTC timestamp.
pub fn from_unix(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let layout = evaluator.date_time_layout(context);
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let text = arena.get(arena.resolve_alias(*id)).value.clone();
        let seconds = value::parse_float(&text).ok_or_else(|| {
            EvalError::TypeError(format!(
                "from_unix expects a number, got {}",
                describe(arena, *id)
            ))
        })?;
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round() as u32;
        let datetime = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
            .ok_or_else(|| EvalError::TypeError(format!("{} is out of the date range", text)))?;
        let rendered = format_with(&datetime.fixed_offset(), &layout)?;
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_TIMESTAMP, rendered));
    }
    Ok(context.child(results))
}

/// `with_dtf(layout; body)`: runs `body` with a different date-time layout.
pub fn with_dtf(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let (layout_expr, body) = block_parts(expr.rhs());
    if body.is_none() {
        return Err(EvalError::ArityError(
            "with_dtf expects with_dtf(layout; expression)".to_string(),
        ));
    }
    let Some(layout) = first_result(evaluator, context, layout_expr)? else {
        return Err(EvalError::ArityError("with_dtf layout produced no result".to_string()));
    };
    let layout = evaluator.arena().get(layout).value.clone();
    trace!("with_dtf layout '{}'", layout);

    let mut scoped = context.clone();
    scoped.date_time_layout = Some(layout);
    let results = evaluator.eval(&scoped, body)?;
    Ok(context.child(results.matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATE_TIME_LAYOUT;

    #[test]
    fn test_parse_with_default_layout() {
        let parsed = parse_datetime("2001-12-14T21:59:43+10:00", DEFAULT_DATE_TIME_LAYOUT).unwrap();
        assert_eq!(parsed.timestamp(), 1008331183);
    }

    #[test]
    fn test_parse_falls_back() {
        let parsed = parse_datetime("2001-12-14", "%d/%m/%Y").unwrap();
        assert_eq!(format_with(&parsed, "%Y").unwrap(), "2001");
        let naive = parse_datetime("14/12/2001 10:00", "%d/%m/%Y %H:%M").unwrap();
        assert_eq!(naive.timestamp(), 1008324000);
        assert!(parse_datetime("not a date", DEFAULT_DATE_TIME_LAYOUT).is_err());
    }

    #[test]
    fn test_bad_layout_is_error() {
        let parsed = parse_datetime("2001-12-14", DEFAULT_DATE_TIME_LAYOUT).unwrap();
        assert!(format_with(&parsed, "%Q").is_err());
    }
}
