//! Evaluate tansy expressions against JSON input

use log::debug;

use super::CliError;
use crate::convert::JsonDecoder;
use crate::output::JsonPrinter;
use crate::{Config, pipeline};

/// Options for the eval and eval-all commands
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON input, possibly several whitespace-separated documents
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Evaluate all documents as one stream
    pub together: bool,
    pub config: Config,
}

/// Result of an eval command
#[derive(Debug, PartialEq)]
pub enum EvalOutcome {
    /// Syntax validation passed
    SyntaxValid,
    /// Printed results, one JSON text per line
    Output(String),
}

/// Execute an eval command. Missing input is treated as a single null
/// document.
pub fn execute(options: &EvalOptions) -> Result<EvalOutcome, CliError> {
    if options.syntax_only {
        let expr = crate::parse_expression(&options.expression)?;
        debug!("syntax ok: {}", expr);
        return Ok(EvalOutcome::SyntaxValid);
    }

    let input = options.input.as_deref().unwrap_or("");
    let output = pipeline::run(
        &options.expression,
        input,
        &JsonDecoder::new(),
        &JsonPrinter::new(options.pretty),
        options.config.clone(),
        options.together,
    )?;
    Ok(EvalOutcome::Output(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(expression: &str, input: &str) -> EvalOptions {
        EvalOptions {
            expression: expression.to_string(),
            input: Some(input.to_string()),
            ..EvalOptions::default()
        }
    }

    #[test]
    fn test_execute_outputs_each_result() {
        let outcome = execute(&options(".[]", "[1, \"a\"]")).unwrap();
        assert_eq!(outcome, EvalOutcome::Output("1\n\"a\"".to_string()));
    }

    #[test]
    fn test_syntax_only() {
        let mut opts = options("[1,2", "");
        opts.syntax_only = true;
        assert!(matches!(execute(&opts), Err(CliError::Parse(_))));
        opts.expression = ".a | .b".to_string();
        assert_eq!(execute(&opts).unwrap(), EvalOutcome::SyntaxValid);
    }

    #[test]
    fn test_disabled_env() {
        let mut opts = options("env(\"HOME\")", "null");
        opts.config = Config::default().with_env_ops(false);
        assert!(matches!(
            execute(&opts),
            Err(CliError::Eval(crate::EvalError::Disabled(_)))
        ));
    }
}
