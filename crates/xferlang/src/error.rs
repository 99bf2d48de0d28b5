use core::fmt;
use std::sync::Arc;

/// One-based location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, column {}", self.row, self.column)
    }
}

/// Stable machine-readable classification of fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Input ended inside a literal, container or instruction.
    UnexpectedEnd,
    /// A character that cannot start or continue the current construct.
    UnexpectedCharacter,
    /// Closing delimiter without a matching opener, or of the wrong kind.
    UnbalancedDelimiter,
    /// A literal whose content does not parse as its declared kind.
    InvalidLiteral,
    /// An escape or character name that does not denote a Unicode scalar.
    InvalidEscape,
    /// The input bytes are not valid UTF-8.
    InvalidEncoding,
    /// A key appears twice in the same object.
    DuplicateKey,
    /// An id is already assigned to another element of the document.
    DuplicateId,
    /// An id assignment with an empty value.
    EmptyId,
    /// A second tag assignment for the same element.
    DuplicateTag,
    /// Array insert whose element type differs from the established one.
    TypeMismatch,
    /// More than one top-level value.
    MultipleRoots,
    /// Instruction payload that does not have the shape the instruction requires.
    InvalidInstruction,
    /// A binding whose value refers to itself.
    SelfReference,
    /// Tree edit addressing an element that is not a child of the given parent.
    NotAChild,
    /// Tree edit that would make an element its own ancestor or target a leaf.
    InvalidOperation,
    /// Reading a file or other host resource failed.
    Io,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnexpectedEnd => "unexpected-end",
            Self::UnexpectedCharacter => "unexpected-character",
            Self::UnbalancedDelimiter => "unbalanced-delimiter",
            Self::InvalidLiteral => "invalid-literal",
            Self::InvalidEscape => "invalid-escape",
            Self::InvalidEncoding => "invalid-encoding",
            Self::DuplicateKey => "duplicate-key",
            Self::DuplicateId => "duplicate-id",
            Self::EmptyId => "empty-id",
            Self::DuplicateTag => "duplicate-tag",
            Self::TypeMismatch => "type-mismatch",
            Self::MultipleRoots => "multiple-roots",
            Self::InvalidInstruction => "invalid-instruction",
            Self::SelfReference => "self-reference",
            Self::NotAChild => "not-a-child",
            Self::InvalidOperation => "invalid-operation",
            Self::Io => "io",
        }
    }

    /// Inverse of [`ErrorCode::as_str`]; unknown strings map to `None`.
    pub fn from_code(s: &str) -> Option<Self> {
        use ErrorCode::*;
        Some(match s {
            "unexpected-end" => UnexpectedEnd,
            "unexpected-character" => UnexpectedCharacter,
            "unbalanced-delimiter" => UnbalancedDelimiter,
            "invalid-literal" => InvalidLiteral,
            "invalid-escape" => InvalidEscape,
            "invalid-encoding" => InvalidEncoding,
            "duplicate-key" => DuplicateKey,
            "duplicate-id" => DuplicateId,
            "empty-id" => EmptyId,
            "duplicate-tag" => DuplicateTag,
            "type-mismatch" => TypeMismatch,
            "multiple-roots" => MultipleRoots,
            "invalid-instruction" => InvalidInstruction,
            "self-reference" => SelfReference,
            "not-a-child" => NotAChild,
            "invalid-operation" => InvalidOperation,
            "io" => Io,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal error raised by parsing, instruction application or tree edits.
///
/// Parse errors carry the position where the offending construct started;
/// errors from programmatic tree edits have no position.
#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub position: Option<Position>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), position: None, source: None }
    }

    /// Attach a source position unless one is already present.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position.get_or_insert(position);
        self
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    pub(crate) fn literal(kind: &str, text: &str) -> Self {
        Self::from_code(ErrorCode::InvalidLiteral, format!("Invalid {kind} literal '{text}'"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} at {pos} ({})", self.message, self.code),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::from_code(ErrorCode::Io, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<crate::scripting::ScriptError> for Error {
    fn from(e: crate::scripting::ScriptError) -> Self {
        Self::from_code(ErrorCode::InvalidInstruction, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_code() {
        let err = Error::from_code(ErrorCode::DuplicateKey, "Key 'a' already exists")
            .at(Position::new(3, 7));
        assert_eq!(err.to_string(), "Key 'a' already exists at row 3, column 7 (duplicate-key)");
    }

    #[test]
    fn at_keeps_first_position() {
        let err = Error::from_code(ErrorCode::EmptyId, "empty")
            .at(Position::new(1, 1))
            .at(Position::new(9, 9));
        assert_eq!(err.position, Some(Position::new(1, 1)));
    }

    #[test]
    fn code_strings_round_trip() {
        for code in [ErrorCode::UnexpectedEnd, ErrorCode::TypeMismatch, ErrorCode::Io] {
            assert_eq!(ErrorCode::from_code(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::from_code("nope"), None);
    }
}
