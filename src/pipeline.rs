//! End-to-end evaluation: decode input, run an expression, print results.
//!
//! Input formats and output printers plug in through the [`Decoder`] and
//! [`Printer`] traits; [`crate::convert::JsonDecoder`] and
//! [`crate::output::JsonPrinter`] are the JSON implementations.
//!
//! # Examples
//!
//! ```
//! use tansy_lang::convert::JsonDecoder;
//! use tansy_lang::output::JsonPrinter;
//! use tansy_lang::pipeline::run;
//! use tansy_lang::Config;
//!
//! let out = run(
//!     ".a + .b",
//!     r#"{"a": 1, "b": 2}"#,
//!     &JsonDecoder::new(),
//!     &JsonPrinter::new(false),
//!     Config::default(),
//!     false,
//! )
//! .unwrap();
//! assert_eq!(out, "3");
//! ```

use std::fmt;

use log::{debug, info};

use crate::config::Config;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Arena, NodeId};
use crate::parser::{ParseError, parse_expression};

/// Reads a text input into zero or more documents.
pub trait Decoder {
    fn decode(&self, arena: &mut Arena, input: &str) -> Result<Vec<NodeId>, EvalError>;
}

/// Renders results as text.
pub trait Printer {
    fn print(&self, arena: &Arena, results: &[NodeId]) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Parse(ParseError),
    Eval(EvalError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Parse(err) => write!(f, "Parse error: {}", err),
            PipelineError::Eval(err) => write!(f, "Evaluation error: {}", err),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Parse(err) => Some(err),
            PipelineError::Eval(err) => Some(err),
        }
    }
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        PipelineError::Parse(err)
    }
}

impl From<EvalError> for PipelineError {
    fn from(err: EvalError) -> Self {
        PipelineError::Eval(err)
    }
}

/// Runs `expression` over every document in `input`.
///
/// Documents are evaluated one after another unless `together` is set, in
/// which case they form a single stream. Empty input is evaluated as one
/// null document.
pub fn run(
    expression: &str,
    input: &str,
    decoder: &dyn Decoder,
    printer: &dyn Printer,
    config: Config,
    together: bool,
) -> Result<String, PipelineError> {
    let expr = parse_expression(expression)?;
    debug!("compiled '{}'", expr);

    let mut evaluator = Evaluator::new(config);
    let mut documents = decoder.decode(evaluator.arena_mut(), input)?;
    if documents.is_empty() {
        documents.push(evaluator.arena_mut().new_null());
    }
    info!("evaluating over {} document(s)", documents.len());

    let results = if together {
        evaluator.evaluate_together(&expr, &documents)?
    } else {
        let mut results = Vec::new();
        for document in &documents {
            results.extend(evaluator.evaluate(&expr, &[*document])?);
        }
        results
    };
    debug!("{} result(s)", results.len());
    Ok(printer.print(evaluator.arena(), &results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::JsonDecoder;
    use crate::output::JsonPrinter;

    fn run_json(expression: &str, input: &str, together: bool) -> Result<String, PipelineError> {
        run(
            expression,
            input,
            &JsonDecoder::new(),
            &JsonPrinter::new(false),
            Config::default(),
            together,
        )
    }

    #[test]
    fn test_documents_run_separately() {
        assert_eq!(run_json(".a", "{\"a\":1} {\"a\":2}", false).unwrap(), "1\n2");
    }

    #[test]
    fn test_together_combines_documents() {
        let out =
            run_json("select(di == 0) * select(di == 1)", "{\"a\":1} {\"b\":2}", true).unwrap();
        assert_eq!(out, r#"{"a":1,"b":2}"#);
        let out = run_json("[.] | length", "1 2 3", true).unwrap();
        assert_eq!(out, "3");
    }

    #[test]
    fn test_empty_input_is_null() {
        assert_eq!(run_json(".", "", false).unwrap(), "null");
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(run_json("[1,2", "{}", false), Err(PipelineError::Parse(_))));
    }
}
