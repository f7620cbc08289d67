//! Restricted expression language for `expr` slot derivations
//!
//! Expressions are parsed into a small AST and walked by an [`Evaluator`]
//! against an [`Environment`] of bindings. Bare names (`x`) resolve to null
//! when unbound; braced names (`{x}`) make the whole expression null when the
//! bound value is null.
//!
//! ```rust
//! use schemamap_core::expr::{Datum, Evaluator, MapEnvironment};
//!
//! let env = MapEnvironment::new().with("age_in_years", Datum::Int(33));
//! let value = Evaluator::restricted()
//!     .evaluate("str({age_in_years}) + ' years'", &env)
//!     .unwrap();
//! assert_eq!(value, Datum::from("33 years"));
//! ```
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Expr, Stmt};
pub use eval::{EvalMode, Environment, Evaluator, MapEnvironment, SOURCE_VARIABLE, TARGET_VARIABLE};
pub use parser::{parse_block, parse_expression};
pub use value::{Datum, Proxy};

/// Whether an expression is a multi-line block rather than a single expression
pub fn is_block(source: &str) -> bool {
    source.trim().contains('\n')
}
