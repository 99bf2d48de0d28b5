use core::fmt;

use crate::error::Position;

/// Non-fatal diagnostic kinds recorded on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A dereference whose name is not bound (yet).
    UnresolvedReference,
    /// Informational record, e.g. a reference resolved by a later pass.
    Trace,
    /// `if` condition naming an operator the engine does not know.
    UnknownConditionalOperator,
    /// Instruction name without a registered handler.
    UnregisteredProcessingInstruction,
    /// Numeric literal that cannot be represented exactly.
    NumericPrecisionLoss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub position: Position,
    /// Name or literal the warning is about, for programmatic filtering.
    pub context: Option<String>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>, position: Position) -> Self {
        Self { kind, message: message.into(), position, context: None }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub const fn row(&self) -> usize {
        self.position.row
    }

    pub const fn column(&self) -> usize {
        self.position.column
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.kind, self.position, self.message)
    }
}
