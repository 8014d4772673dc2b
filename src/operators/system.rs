use std::fs;

use log::{debug, info};

use crate::ast::expressions::ExpressionNode;
use crate::context::Context;
use crate::convert::{self, JsonDecoder};
use crate::evaluator::{EvalError, Evaluator};
use crate::node::NodeId;
use crate::parser::parse_expression;
use crate::pipeline::Decoder;

use super::{first_result, string_arg};

fn name_arg(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
    operator: &str,
) -> Result<String, EvalError> {
    match first_result(evaluator, context, expr.rhs())? {
        Some(id) => Ok(evaluator.arena().get(id).value.clone()),
        None => Err(EvalError::ArityError(format!("{} expects a name", operator))),
    }
}

fn ensure_env_enabled(evaluator: &Evaluator, operator: &str) -> Result<(), EvalError> {
    if evaluator.config().disable_env_ops {
        return Err(EvalError::Disabled(format!("{} operations have been disabled", operator)));
    }
    Ok(())
}

fn ensure_file_enabled(evaluator: &Evaluator, operator: &str) -> Result<(), EvalError> {
    if evaluator.config().disable_file_ops {
        return Err(EvalError::Disabled(format!("{} operations have been disabled", operator)));
    }
    Ok(())
}

/// `env(NAME)`: the variable parsed as JSON when it is valid JSON, a
/// string otherwise, null when unset.
pub fn env(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    ensure_env_enabled(evaluator, "env")?;
    let name = name_arg(evaluator, context, expr, "env")?;
    let arena = evaluator.arena_mut();
    let result = match std::env::var(&name) {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(parsed) => convert::from_json(arena, &parsed),
            Err(_) => arena.new_str(text),
        },
        Err(_) => {
            debug!("environment variable {} is not set", name);
            arena.new_null()
        }
    };
    Ok(context.single_child(result))
}

/// `strenv(NAME)`: the variable as a plain string.
pub fn strenv(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    ensure_env_enabled(evaluator, "env")?;
    let name = name_arg(evaluator, context, expr, "strenv")?;
    let arena = evaluator.arena_mut();
    let result = match std::env::var(&name) {
        Ok(text) => arena.new_str(text),
        Err(_) => arena.new_null(),
    };
    Ok(context.single_child(result))
}

fn read_file(path: &str) -> Result<String, EvalError> {
    info!("loading {}", path);
    fs::read_to_string(path).map_err(|err| EvalError::IoError(format!("{}: {}", path, err)))
}

/// `load(path)`: every document in a JSON file, or null for an empty file.
pub fn load(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    ensure_file_enabled(evaluator, "file")?;
    let mut results: Vec<NodeId> = Vec::new();
    for id in &context.matches {
        let path = string_arg(evaluator, context, *id, expr.rhs(), "load")?;
        let text = read_file(&path)?;
        let arena = evaluator.arena_mut();
        let documents = JsonDecoder::new()
            .with_file(path.clone(), 0)
            .decode(arena, &text)
            .map_err(|err| EvalError::IoError(format!("{}: {}", path, err)))?;
        if documents.is_empty() {
            results.push(arena.new_null());
        }
        results.extend(documents);
    }
    Ok(context.child(results))
}

/// `load_str(path)`: the raw file contents as a string.
pub fn load_str(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    ensure_file_enabled(evaluator, "file")?;
    let mut results = Vec::new();
    for id in &context.matches {
        let path = string_arg(evaluator, context, *id, expr.rhs(), "load_str")?;
        let text = read_file(&path)?;
        results.push(evaluator.arena_mut().new_str(text));
    }
    Ok(context.child(results))
}

/// `error(msg)`: fails with `msg` as soon as there is something to fail on.
pub fn error(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let Some(first) = context.first() else {
        return Ok(context.child(Vec::new()));
    };
    let message = evaluator
        .eval_single_readonly(context, first, expr.rhs())?
        .first()
        .map(|id| evaluator.arena().get(id).value.clone())
        .unwrap_or_else(|| "error".to_string());
    Err(EvalError::UserError(message))
}

/// `eval(expr)`: compiles the string and evaluates it against the match.
pub fn eval(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let mut results = Vec::new();
    for id in &context.matches {
        let source = string_arg(evaluator, context, *id, expr.rhs(), "eval")?;
        let compiled = parse_expression(&source)?;
        debug!("eval compiled '{}'", compiled);
        results.extend(evaluator.eval_single(context, *id, compiled.root())?.matches);
    }
    Ok(context.child(results))
}
