//! # Tansy Expression Language - Abstract Syntax Tree
//!
//! Tansy queries and rewrites structured documents: maps, sequences and
//! scalars that also carry tags, styles, comments and anchors. Every
//! expression consumes an ordered stream of document nodes and produces
//! another one.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Static operator descriptors (arity, precedence, handler)
//! - **[preferences]** - Per-operator options carried on tree nodes
//! - **[expressions]** - The compiled binary expression tree
//!
//! ## Quick Start
//!
//! ```text
//! .users[] | select(.active) | .name
//! ```
//!
//! Streams every active user's name.
//!
//! ## Core Concepts
//!
//! ### Streams
//!
//! `.a, .b` yields two results; `[...]` collects a stream into one sequence
//! and `{...}` builds maps, one per combination of key and value results.
//!
//! ### Binary operators cross their operands
//!
//! `.a + .b` evaluates both sides against the same input and combines every
//! left result with every right result, left outer and right inner.
//!
//! ### Assignment rewrites the input
//!
//! ```text
//! .a.b = 1          # creates a and b when missing
//! .items[] |= . * 2 # right side evaluated per match
//! .a tag = "!!str"  # metadata writers pair with their readers
//! ```
//!
//! ### Merging
//!
//! `*` deep-merges maps. Flags pick the array policy (`*+` append, `*d`
//! index-wise), restrict keys (`*?` existing only, `*n` new only) and pick
//! the comment policy (`*C`, `*A`, `*I`).

pub mod expressions;
pub mod operators;
pub mod preferences;
pub mod tokens;

pub use expressions::{Expression, ExpressionNode, Operation};
pub use operators::OperationType;
pub use preferences::Prefs;
pub use tokens::{Token, TokenKind};
