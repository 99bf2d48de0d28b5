//! Processing instructions: `<! name payload !>`.
//!
//! The parser looks instruction names up (case-insensitively) in an
//! [`InstructionRegistry`]. A factory validates the payload shape and
//! produces the [`InstructionKind`] whose behavior the parser then applies
//! to the instruction's target element.

mod document_meta;

use std::collections::HashMap;
use std::sync::Arc;

use compact_str::CompactString;

use crate::Document;
use crate::element::{ElementId, ElementKind};
use crate::error::{Error, ErrorCode, Result};

pub use document_meta::DocumentMetadata;

/// Result of evaluating an `if` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    Met,
    NotMet,
    /// The condition named an operator the engine does not know; the
    /// target is kept and the instruction stays visible.
    UnknownOperator(CompactString),
}

/// Instruction-specific state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    Id,
    Tag,
    Document,
    DynamicSource,
    CharDef,
    Defined { defined: Option<bool> },
    If { outcome: Option<ConditionOutcome> },
    Let { name: Option<CompactString> },
    Script { executed: bool },
    /// Host-registered name without built-in behavior.
    Custom,
    /// Name without any registration; kept verbatim.
    Unregistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub name: CompactString,
    pub kind: InstructionKind,
    /// Element the instruction applies to, once known.
    pub target: Option<ElementId>,
    pub suppress_serialization: bool,
}

impl Instruction {
    pub fn new(name: impl Into<CompactString>, kind: InstructionKind) -> Self {
        Self { name: name.into(), kind, target: None, suppress_serialization: false }
    }
}

/// Builds an instruction's state from the document and its payload value.
pub type InstructionFactory = Arc<dyn Fn(&Document, ElementId) -> Result<InstructionKind> + Send + Sync>;

/// Name-to-factory table for processing instructions.
#[derive(Clone)]
pub struct InstructionRegistry {
    factories: HashMap<CompactString, InstructionFactory>,
}

impl Default for InstructionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionRegistry {
    /// Registry with the built-in instructions.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("id", |doc, value| text_payload(doc, value, "id").map(|()| InstructionKind::Id));
        registry.register("tag", |doc, value| text_payload(doc, value, "tag").map(|()| InstructionKind::Tag));
        registry.register("document", |doc, value| {
            object_payload(doc, value, "document").map(|()| InstructionKind::Document)
        });
        registry.register("dynamicSource", |doc, value| {
            object_payload(doc, value, "dynamicSource").map(|()| InstructionKind::DynamicSource)
        });
        registry.register("chardef", |doc, value| {
            object_payload(doc, value, "chardef").map(|()| InstructionKind::CharDef)
        });
        registry.register("defined", |_, _| Ok(InstructionKind::Defined { defined: None }));
        registry.register("if", |_, _| Ok(InstructionKind::If { outcome: None }));
        registry.register("let", |_, _| Ok(InstructionKind::Let { name: None }));
        registry.register("script", |doc, value| match doc.kind(value) {
            ElementKind::Tuple | ElementKind::Array { .. } | ElementKind::KeyValuePair { .. } => {
                Ok(InstructionKind::Script { executed: false })
            }
            other => Err(invalid("script", format!("expects a list of operations, found a {}", other.name()))),
        });
        registry
    }

    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Document, ElementId) -> Result<InstructionKind> + Send + Sync + 'static,
    {
        self.factories.insert(CompactString::from(name.to_lowercase()), Arc::new(factory));
    }

    /// Recognize `name` without giving it behavior.
    pub fn register_custom(&mut self, name: &str) {
        self.register(name, |_, _| Ok(InstructionKind::Custom));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name.to_lowercase().as_str()).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name.to_lowercase().as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(CompactString::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `None` when the name is not registered.
    pub fn create(&self, doc: &Document, name: &str, value: ElementId) -> Option<Result<InstructionKind>> {
        self.factories.get(name.to_lowercase().as_str()).map(|factory| factory(doc, value))
    }
}

fn invalid(name: &str, detail: String) -> Error {
    Error::from_code(ErrorCode::InvalidInstruction, format!("Instruction '{name}' {detail}"))
}

fn text_payload(doc: &Document, value: ElementId, name: &str) -> Result<()> {
    if doc.kind(value).is_text() {
        Ok(())
    } else {
        Err(invalid(name, format!("requires a text value, found a {}", doc.kind(value).name())))
    }
}

fn object_payload(doc: &Document, value: ElementId, name: &str) -> Result<()> {
    if matches!(doc.kind(value), ElementKind::Object) {
        Ok(())
    } else {
        Err(invalid(name, format!("requires an object, found a {}", doc.kind(value).name())))
    }
}

impl Document {
    /// Create a detached instruction `<! name value !>`.
    pub fn create_instruction(&mut self, name: &str, kind: InstructionKind, value: ElementId) -> Result<ElementId> {
        let pi = self.create(ElementKind::ProcessingInstruction(Instruction::new(name, kind)));
        let payload = self.new_pair(name, value)?;
        self.add(pi, payload)?;
        Ok(pi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_case_insensitive() {
        let registry = InstructionRegistry::new();
        assert!(registry.contains("DynamicSource"));
        assert!(registry.contains("ID"));
        assert!(!registry.contains("unknown"));
    }

    #[test]
    fn tag_payload_must_be_text() {
        let registry = InstructionRegistry::new();
        let mut doc = Document::new();
        let number = doc.create(ElementKind::Integer(1));
        let text = doc.create(ElementKind::string("x"));
        let err = registry.create(&doc, "tag", number).unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInstruction);
        assert_eq!(registry.create(&doc, "tag", text).unwrap().unwrap(), InstructionKind::Tag);
    }

    #[test]
    fn custom_registration() {
        let mut registry = InstructionRegistry::empty();
        registry.register_custom("audit");
        let mut doc = Document::new();
        let v = doc.create(ElementKind::Null);
        assert_eq!(registry.create(&doc, "Audit", v).unwrap().unwrap(), InstructionKind::Custom);
        assert!(registry.create(&doc, "id", v).is_none());
    }
}
