#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # stx-eval
//!
//! Evaluates the parsed files of one instance into a concrete JSON value
//! tree by unification.
//!
//! - All files share one package scope; declarations of the same label unify.
//! - References resolve lexically, innermost struct first. Cycles are errors.
//! - `string`, `int`, `float`, `number`, `bool` and `_` are predeclared.
//! - Disjunctions keep their `*` defaults; export picks the single default.
//! - Export drops definitions, hidden and optional fields and fails on values
//!   that are not concrete.
//!
//! ```
//! use stx_syntax::{ParseOptions, Revision, parse_file};
//!
//! let file = parse_file(
//!     "web.cue",
//!     "package cfn\n#Port: *80 | int\nport: #Port",
//!     ParseOptions::new(Revision::Legacy),
//! )
//! .unwrap();
//! let value = stx_eval::evaluate([&file]).unwrap();
//! assert_eq!(value, serde_json::json!({"port": 80}));
//! ```

pub mod error;
mod eval;
mod export;
mod scope;
pub mod unify;
pub mod value;

pub use error::{EvalError, EvalErrorKind, EvalResult};
pub use export::export;
pub use value::{Kind, Val};

use std::time::Instant;

/// Evaluate the files of one instance and export the result
pub fn evaluate<'a, I>(files: I) -> EvalResult<serde_json::Value>
where
    I: IntoIterator<Item = &'a stx_syntax::ParsedFile>,
{
    let value = evaluate_value(files)?;
    export(&value)
}

/// Evaluate the files of one instance without exporting
pub fn evaluate_value<'a, I>(files: I) -> EvalResult<Val>
where
    I: IntoIterator<Item = &'a stx_syntax::ParsedFile>,
{
    let files: Vec<_> = files.into_iter().collect();
    let started = Instant::now();
    let result = eval::Evaluator::new(files).evaluate();
    tracing::trace!(
        elapsed_us = started.elapsed().as_micros() as u64,
        ok = result.is_ok(),
        "evaluated instance"
    );
    result
}
