//! Tree-edit operations. Every structural change goes through here so that
//! single ownership, array homogeneity, key uniqueness and the id/tag
//! indices hold after each call.

use compact_str::CompactString;

use super::Document;
use crate::element::{ElementId, ElementKind};
use crate::error::{Error, ErrorCode, Result};

impl Document {
    /// Append `child` to `parent`, detaching it from its previous parent.
    pub fn add(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        let len = self.node(parent).children.len();
        self.insert(parent, len, child)
    }

    /// Insert `child` at `index` of `parent`'s full child list.
    pub fn insert(&mut self, parent: ElementId, index: usize, child: ElementId) -> Result<()> {
        self.check_attach(parent, child, None)?;
        self.index_subtree(child)?;
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.refresh_array_type(parent);
        Ok(())
    }

    /// Detach an element from its parent (or from the top level) and drop
    /// its subtree from the indices. Returns `false` if it was not attached.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let attached = self.node(id).parent.is_some() || self.top_level.contains(&id);
        if attached {
            self.detach(id);
            self.unindex_subtree(id);
            tracing::trace!(element = id.index(), "removed element");
        }
        attached
    }

    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        self.node(child).parent == Some(parent) && self.remove(child)
    }

    /// Remove the child at `index` of the full child list.
    pub fn remove_child_at(&mut self, parent: ElementId, index: usize) -> Option<ElementId> {
        let child = self.node(parent).children.get(index).copied()?;
        self.remove(child).then_some(child)
    }

    /// Remove every child and return how many were removed. Arrays forget
    /// their element type.
    pub fn remove_all_children(&mut self, parent: ElementId) -> usize {
        let children = std::mem::take(&mut self.node_mut(parent).children);
        for child in &children {
            self.node_mut(*child).parent = None;
            self.unindex_subtree(*child);
        }
        self.refresh_array_type(parent);
        children.len()
    }

    /// Put `new` in the place of `old` under `parent`.
    pub fn replace_child(&mut self, parent: ElementId, old: ElementId, new: ElementId) -> Result<()> {
        if self.node(old).parent != Some(parent) {
            return Err(Error::from_code(
                ErrorCode::NotAChild,
                "The element to replace is not a child of this parent",
            ));
        }
        if old == new {
            return Ok(());
        }
        self.check_attach(parent, new, Some(old))?;
        self.unindex_subtree(old);
        if let Err(err) = self.index_subtree(new) {
            self.index_subtree(old)?;
            return Err(err);
        }
        self.detach(new);
        let children = &mut self.node_mut(parent).children;
        if let Some(slot) = children.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
        self.refresh_array_type(parent);
        Ok(())
    }

    /// Create a detached key/value pair owning `value`.
    pub fn new_pair(&mut self, key: &str, value: ElementId) -> Result<ElementId> {
        let kvp = self.create(ElementKind::KeyValuePair { key: CompactString::from(key) });
        self.add(kvp, value)?;
        Ok(kvp)
    }

    /// Add `key value` to an object; an existing key is an error.
    pub fn add_pair(&mut self, object: ElementId, key: &str, value: ElementId) -> Result<ElementId> {
        self.expect_object(object)?;
        if self.object_get_pair(object, key).is_some() {
            return Err(duplicate_key(key));
        }
        let kvp = self.new_pair(key, value)?;
        self.add(object, kvp)?;
        Ok(kvp)
    }

    /// Add `key value`, or replace the value of an existing pair in place.
    pub fn add_or_update(&mut self, object: ElementId, key: &str, value: ElementId) -> Result<ElementId> {
        self.expect_object(object)?;
        let Some(kvp) = self.object_get_pair(object, key) else {
            return self.add_pair(object, key, value);
        };
        match self.kvp_value(kvp) {
            Some(old) => self.replace_child(kvp, old, value)?,
            None => self.add(kvp, value)?,
        }
        Ok(kvp)
    }

    pub fn remove_key(&mut self, object: ElementId, key: &str) -> bool {
        self.object_get_pair(object, key).is_some_and(|kvp| self.remove(kvp))
    }

    /// Swap `old` for `new` wherever `old` sits, carrying over its id, tag
    /// and any instructions bound to it.
    pub(crate) fn substitute(&mut self, old: ElementId, new: ElementId) -> Result<()> {
        let id = self.node(old).id.clone();
        let tag = self.node(old).tag.clone();
        self.clear_id(old);
        self.clear_tag(old);
        if let Some(id) = id {
            self.set_id(new, &id)?;
        }
        if let Some(tag) = tag {
            self.clear_tag(new);
            self.set_tag(new, &tag)?;
        }
        let instructions = self.instructions.clone();
        for pi in instructions {
            if let Some(instr) = self.instruction_mut(pi)
                && instr.target == Some(old)
            {
                instr.target = Some(new);
            }
        }
        match self.node(old).parent {
            Some(parent) => self.replace_child(parent, old, new),
            None if self.root == Some(old) => self.set_root(new),
            None => Ok(()),
        }
    }

    /// Unlink from the parent or top level without touching the indices.
    pub(crate) fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
            self.refresh_array_type(parent);
        } else if let Some(pos) = self.top_level.iter().position(|t| *t == id) {
            self.top_level.remove(pos);
            if self.root == Some(id) {
                self.root = None;
            }
        }
    }

    fn refresh_array_type(&mut self, array: ElementId) {
        if !matches!(self.kind(array), ElementKind::Array { .. }) {
            return;
        }
        let first = self.node(array).children.iter().find_map(|c| self.kind(*c).element_type());
        if let ElementKind::Array { element_type } = self.kind_mut(array) {
            *element_type = first;
        }
    }

    fn expect_object(&self, object: ElementId) -> Result<()> {
        if matches!(self.kind(object), ElementKind::Object) {
            Ok(())
        } else {
            Err(Error::from_code(
                ErrorCode::InvalidOperation,
                format!("Expected an object, found a {}", self.kind(object).name()),
            ))
        }
    }

    /// Validate attaching `child` under `parent`, optionally in place of
    /// `replacing`.
    fn check_attach(&self, parent: ElementId, child: ElementId, replacing: Option<ElementId>) -> Result<()> {
        let parent_kind = self.kind(parent);
        if !parent_kind.is_container() {
            return Err(Error::from_code(
                ErrorCode::InvalidOperation,
                format!("A {} cannot have children", parent_kind.name()),
            ));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(Error::from_code(
                ErrorCode::InvalidOperation,
                "An element cannot be added to itself or to one of its descendants",
            ));
        }
        let child_kind = self.kind(child);
        let others: Vec<ElementId> = self
            .node(parent)
            .children
            .iter()
            .copied()
            .filter(|c| Some(*c) != replacing && *c != child)
            .collect();
        match parent_kind {
            ElementKind::Object if child_kind.is_semantic() => {
                let ElementKind::KeyValuePair { key } = child_kind else {
                    return Err(Error::from_code(
                        ErrorCode::TypeMismatch,
                        format!("Objects only hold key/value pairs, not a {}", child_kind.name()),
                    ));
                };
                if others.iter().any(|c| self.pair_key(*c) == Some(key.as_str())) {
                    return Err(duplicate_key(key));
                }
            }
            ElementKind::KeyValuePair { key } if child_kind.is_semantic() => {
                if others.iter().any(|c| self.kind(*c).is_semantic()) {
                    return Err(Error::from_code(
                        ErrorCode::InvalidOperation,
                        format!("Key '{key}' already has a value"),
                    ));
                }
            }
            ElementKind::ProcessingInstruction(pi) => {
                if !matches!(child_kind, ElementKind::KeyValuePair { .. }) || !others.is_empty() {
                    return Err(Error::from_code(
                        ErrorCode::InvalidOperation,
                        format!("Instruction '{}' holds exactly one keyed payload", pi.name),
                    ));
                }
            }
            ElementKind::Array { element_type: Some(expected) } => {
                if let Some(actual) = child_kind.element_type()
                    && actual != *expected
                    && others.iter().any(|c| self.kind(*c).element_type().is_some())
                {
                    return Err(Error::from_code(
                        ErrorCode::TypeMismatch,
                        format!("Array of {expected} cannot hold a {actual} element"),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn duplicate_key(key: &str) -> Error {
    Error::from_code(ErrorCode::DuplicateKey, format!("Key '{key}' already exists in object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;

    fn array(doc: &mut Document) -> ElementId {
        doc.create(ElementKind::empty_array())
    }

    #[test]
    fn array_type_is_fixed_then_reset() {
        let mut doc = Document::new();
        let arr = array(&mut doc);
        let one = doc.create(ElementKind::Integer(1));
        let text = doc.create(ElementKind::string("x"));
        doc.add(arr, one).unwrap();
        assert_eq!(doc.kind(arr), &ElementKind::Array { element_type: Some(ElementType::Integer) });
        assert_eq!(doc.add(arr, text).unwrap_err().code, ErrorCode::TypeMismatch);
        assert_eq!(doc.remove_all_children(arr), 1);
        doc.add(arr, text).unwrap();
        assert_eq!(doc.kind(arr), &ElementKind::Array { element_type: Some(ElementType::Text) });
    }

    #[test]
    fn replacing_only_item_may_change_array_type() {
        let mut doc = Document::new();
        let arr = array(&mut doc);
        let one = doc.create(ElementKind::Integer(1));
        doc.add(arr, one).unwrap();
        let yes = doc.create(ElementKind::Boolean(true));
        doc.replace_child(arr, one, yes).unwrap();
        assert_eq!(doc.kind(arr), &ElementKind::Array { element_type: Some(ElementType::Boolean) });
        assert_eq!(doc.parent(one), None);
    }

    #[test]
    fn reparenting_detaches_from_previous_parent() {
        let mut doc = Document::new();
        let a = doc.create(ElementKind::Tuple);
        let b = doc.create(ElementKind::Tuple);
        let v = doc.create(ElementKind::Null);
        doc.add(a, v).unwrap();
        doc.add(b, v).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.parent(v), Some(b));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut doc = Document::new();
        let outer = doc.create(ElementKind::Tuple);
        let inner = doc.create(ElementKind::Tuple);
        doc.add(outer, inner).unwrap();
        assert_eq!(doc.add(inner, outer).unwrap_err().code, ErrorCode::InvalidOperation);
    }

    #[test]
    fn object_upsert_keeps_count() {
        let mut doc = Document::new();
        let obj = doc.create(ElementKind::Object);
        let v1 = doc.create(ElementKind::Integer(1));
        let v2 = doc.create(ElementKind::Integer(2));
        let v3 = doc.create(ElementKind::Integer(3));
        doc.add_pair(obj, "a", v1).unwrap();
        assert_eq!(doc.add_pair(obj, "a", v2).unwrap_err().code, ErrorCode::DuplicateKey);
        doc.add_or_update(obj, "a", v3).unwrap();
        assert_eq!(doc.semantic_count(obj), 1);
        assert_eq!(doc.object_get(obj, "a"), Some(v3));
    }

    #[test]
    fn removal_unindexes_ids_and_tags() {
        let mut doc = Document::new();
        let t = doc.create(ElementKind::Tuple);
        let v = doc.create(ElementKind::Null);
        doc.add(t, v).unwrap();
        doc.set_id(v, "v").unwrap();
        doc.set_tag(v, "grp").unwrap();
        assert!(doc.remove(v));
        assert_eq!(doc.find_by_id("v"), None);
        assert!(!doc.contains_tag("grp"));
        assert!(!doc.remove(v));
        doc.add(t, v).unwrap();
        assert_eq!(doc.find_by_id("v"), Some(v));
    }

    #[test]
    fn replace_child_requires_membership() {
        let mut doc = Document::new();
        let t = doc.create(ElementKind::Tuple);
        let a = doc.create(ElementKind::Null);
        let b = doc.create(ElementKind::Null);
        assert_eq!(doc.replace_child(t, a, b).unwrap_err().code, ErrorCode::NotAChild);
    }
}
