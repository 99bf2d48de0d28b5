//! Operator registry and scripting engine used by conditional instructions.
//!
//! Operators are looked up case-insensitively by name. Built-in operators
//! are collected at link time through [`register_operator!`] and seeded
//! into a registry the first time it is queried.

mod context;
mod engine;
mod operators;
mod registry;
pub mod value;

use std::sync::Arc;

pub use context::ScriptingContext;
pub use engine::ScriptingEngine;
pub use registry::{OperatorRegistry, RegistryDiagnostics};
pub use value::ScriptValue;

use crate::document::ElementRef;

/// Grouping used for discovery and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorCategory {
    Comparison,
    Logical,
    Utility,
    Custom,
}

/// Misuse of the scripting API or a failing operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("Operator '{name}' expects {expected} argument(s), got {actual}")]
    WrongArity { name: String, expected: String, actual: usize },
    #[error("Operator '{0}' requires an argument list")]
    MissingArguments(String),
    #[error("Operator '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Operator '{name}' failed: {message}")]
    Evaluation { name: String, message: String },
}

/// A named operation over element arguments.
///
/// The engine checks the argument count against
/// [`min_arguments`](Operator::min_arguments) and
/// [`max_arguments`](Operator::max_arguments) before calling
/// [`evaluate`](Operator::evaluate).
pub trait Operator: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Custom
    }

    fn min_arguments(&self) -> usize;

    /// `None` for variadic operators.
    fn max_arguments(&self) -> Option<usize>;

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError>;
}

/// Link-time registration of an operator factory.
pub struct OperatorRegistration {
    pub factory: fn() -> Arc<dyn Operator>,
}

inventory::collect!(OperatorRegistration);

pub fn registered_operators() -> impl Iterator<Item = Arc<dyn Operator>> {
    inventory::iter::<OperatorRegistration>.into_iter().map(|entry| (entry.factory)())
}

#[macro_export]
macro_rules! register_operator {
    ($factory:expr) => {
        inventory::submit! {
            $crate::scripting::OperatorRegistration { factory: $factory }
        }
    };
}

pub use register_operator;

pub(crate) fn arity_text(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    }
}
