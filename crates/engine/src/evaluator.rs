//! Evaluation seam.

use serde_json::Value;
use stx_eval::EvalError;

use crate::instance::Instance;

/// Turns one instance into a concrete value tree.
///
/// Implementations are shared by every evaluation task and must keep their
/// per-call state local.
pub trait Evaluator: Send + Sync {
    /// Evaluate `instance` on its own.
    fn evaluate(&self, instance: &Instance) -> Result<Value, EvalError>;
}

impl<F> Evaluator for F
where
    F: Fn(&Instance) -> Result<Value, EvalError> + Send + Sync,
{
    fn evaluate(&self, instance: &Instance) -> Result<Value, EvalError> {
        self(instance)
    }
}

/// Evaluates instances by unifying their files.
///
/// Load errors take precedence: the first one becomes the evaluation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifyEvaluator;

impl Evaluator for UnifyEvaluator {
    fn evaluate(&self, instance: &Instance) -> Result<Value, EvalError> {
        if let Some(first) = instance.errors().first() {
            let mut error = EvalError::from(first);
            match instance.errors().len() - 1 {
                0 => {}
                1 => error.message.push_str(" (and 1 more error)"),
                more => error.message.push_str(&format!(" (and {more} more errors)")),
            }
            return Err(error);
        }
        stx_eval::evaluate(instance.files().iter().map(AsRef::as_ref))
    }
}
