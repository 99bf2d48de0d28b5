//! XferLang: a typed, human-readable data-interchange format.
//!
//! [`parse`] turns text into a [`Document`] (an arena of elements plus id
//! and tag indices, processing instructions and warnings); [`to_text`]
//! renders it back.

pub mod chars;
pub mod document;
pub mod dynamic;
pub mod element;
pub mod error;
pub mod parser;
pub mod pi;
pub mod resolver;
pub mod scripting;
pub mod serializer;
pub mod warning;

pub use document::{Document, ElementRef};
pub use element::{DateTimeHandling, DateTimeValue, ElementId, ElementKind, ElementType};
pub use error::{Error, ErrorCode, Position, Result};
pub use parser::{Parser, ParserOptions};
pub use pi::{DocumentMetadata, InstructionKind, InstructionRegistry};
pub use scripting::{OperatorRegistry, ScriptValue, ScriptingContext, ScriptingEngine};
pub use serializer::{Formatting, SerializeOptions};
pub use warning::{Warning, WarningKind};

/// Parse with the process-wide default [`ParserOptions`].
pub fn parse(text: &str) -> Result<Document> {
    Parser::new().parse(text)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Document> {
    Parser::new().parse_bytes(bytes)
}

/// Serialize with the process-wide default [`SerializeOptions`].
pub fn to_text(doc: &Document) -> String {
    doc.to_text()
}
