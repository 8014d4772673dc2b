pub mod ast;
pub mod config;
pub mod context;
pub mod convert;
pub mod evaluator;
pub mod lexer;
pub mod merge;
pub mod node;
pub mod operators;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod postfix;
pub mod traverse;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Expression, ExpressionNode, Token};
pub use config::Config;
pub use context::Context;
pub use convert::{JsonDecoder, from_json, to_json};
pub use evaluator::{EvalError, Evaluator};
pub use lexer::{LexError, Lexer};
pub use node::{Arena, Kind, Node, NodeId};
pub use output::{JsonPrinter, encode_json};
pub use parser::{ParseError, parse_expression};
pub use pipeline::{Decoder, PipelineError, Printer};
