//! `let` bindings and dereference resolution.
//!
//! Dereferences are resolved in two passes. The immediate pass runs when a
//! `_name` is parsed and replaces it with a deep clone of the bound value.
//! A miss is queued as a [`PendingReference`] with a tentative warning. The
//! local pass runs after a `script` instruction has executed and retries
//! the queued references inside its target.

use std::collections::HashMap;

use compact_str::CompactString;

use crate::Document;
use crate::element::{ElementId, ElementKind};
use crate::error::{Position, Result};
use crate::warning::{Warning, WarningKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    Pending,
    Resolved,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub element: ElementId,
    pub name: CompactString,
    pub position: Position,
    pub state: ReferenceState,
    warning: usize,
}

#[derive(Debug, Default)]
pub struct Resolver {
    bindings: HashMap<CompactString, ElementId>,
    pending: Vec<PendingReference>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`; later bindings shadow earlier ones.
    pub fn bind(&mut self, name: &str, value: ElementId) {
        tracing::debug!(name, element = value.index(), "bound name");
        self.bindings.insert(CompactString::from(name), value);
    }

    pub fn lookup(&self, name: &str) -> Option<ElementId> {
        self.bindings.get(name).copied()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn pending(&self) -> &[PendingReference] {
        &self.pending
    }

    /// Resolve a freshly parsed dereference. Returns the element that takes
    /// its place: a clone of the bound value, or the placeholder itself.
    pub fn resolve_immediate(
        &mut self,
        doc: &mut Document,
        placeholder: ElementId,
        name: &str,
        position: Position,
    ) -> ElementId {
        if let Some(bound) = self.lookup(name) {
            tracing::trace!(name, "dereference resolved");
            return doc.deep_clone(bound);
        }
        let warning = doc.push_warning(
            Warning::new(WarningKind::UnresolvedReference, format!("Unresolved reference '_{name}'"), position)
                .with_context(name),
        );
        self.pending.push(PendingReference {
            element: placeholder,
            name: CompactString::from(name),
            position,
            state: ReferenceState::Pending,
            warning,
        });
        placeholder
    }

    /// Retry pending references inside `scope` against the current
    /// bindings. Returns how many were resolved.
    pub fn resolve_local(&mut self, doc: &mut Document, scope: ElementId) -> Result<usize> {
        let mut resolved = 0;
        for index in 0..self.pending.len() {
            let entry = &self.pending[index];
            if entry.state != ReferenceState::Pending {
                continue;
            }
            let element = entry.element;
            if element != scope && !doc.is_ancestor(scope, element) {
                continue;
            }
            let Some(bound) = self.lookup(&entry.name) else {
                continue;
            };
            let name = entry.name.clone();
            let warning = entry.warning;
            let replacement = doc.deep_clone(bound);
            doc.substitute(element, replacement)?;
            if let Some(w) = doc.warning_mut(warning) {
                w.kind = WarningKind::Trace;
                w.message = format!("Reference '_{name}' resolved in local pass");
            }
            self.pending[index].element = replacement;
            self.pending[index].state = ReferenceState::Resolved;
            resolved += 1;
            tracing::debug!(name = %name, "dereference resolved in local pass");
        }
        Ok(resolved)
    }

    /// Mark everything still pending as unresolved; their warnings stay.
    pub fn finish(&mut self) {
        for entry in &mut self.pending {
            if entry.state == ReferenceState::Pending {
                entry.state = ReferenceState::Unresolved;
            }
        }
    }
}

/// Whether the subtree at `value` contains an unresolved `_name`.
pub fn refers_to(doc: &Document, value: ElementId, name: &str) -> bool {
    doc.subtree(value)
        .into_iter()
        .any(|id| matches!(doc.kind(id), ElementKind::Reference(r) if r.as_str() == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_hit_clones_bound_value() {
        let mut doc = Document::new();
        let mut resolver = Resolver::new();
        let value = doc.create(ElementKind::Integer(42));
        resolver.bind("x", value);
        let placeholder = doc.create(ElementKind::Reference("x".into()));
        let got = resolver.resolve_immediate(&mut doc, placeholder, "x", Position::new(1, 1));
        assert_ne!(got, value);
        assert_eq!(doc.kind(got), &ElementKind::Integer(42));
        assert!(doc.warnings().is_empty());
    }

    #[test]
    fn local_pass_retracts_warning() {
        let mut doc = Document::new();
        let mut resolver = Resolver::new();
        let tuple = doc.create(ElementKind::Tuple);
        let placeholder = doc.create(ElementKind::Reference("v".into()));
        let kept = resolver.resolve_immediate(&mut doc, placeholder, "v", Position::new(1, 2));
        doc.add(tuple, kept).unwrap();
        assert_eq!(doc.warnings()[0].kind, WarningKind::UnresolvedReference);
        assert_eq!(doc.warnings()[0].context.as_deref(), Some("v"));

        let value = doc.create(ElementKind::string("late"));
        resolver.bind("v", value);
        assert_eq!(resolver.resolve_local(&mut doc, tuple).unwrap(), 1);
        assert_eq!(doc.warnings()[0].kind, WarningKind::Trace);
        assert!(doc.warnings()[0].message.contains("resolved"));
        let first = doc.get_at(tuple, 0).unwrap();
        assert_eq!(doc.kind(first), &ElementKind::string("late"));
        assert_eq!(resolver.pending()[0].state, ReferenceState::Resolved);
    }

    #[test]
    fn finish_marks_unresolved() {
        let mut doc = Document::new();
        let mut resolver = Resolver::new();
        let placeholder = doc.create(ElementKind::Reference("gone".into()));
        resolver.resolve_immediate(&mut doc, placeholder, "gone", Position::new(1, 1));
        resolver.finish();
        assert_eq!(resolver.pending()[0].state, ReferenceState::Unresolved);
    }
}
