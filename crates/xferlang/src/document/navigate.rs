use core::fmt;

use super::Document;
use crate::element::{ElementId, ElementKind};

impl Document {
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).parent
    }

    /// All children in document order, comments and instructions included.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.node(id).children
    }

    /// Children that are values (no comments or instructions).
    pub fn semantic_children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.node(id).children.iter().copied().filter(|c| self.kind(*c).is_semantic())
    }

    pub fn semantic_count(&self, id: ElementId) -> usize {
        self.semantic_children(id).count()
    }

    /// Semantic child at `index`.
    pub fn get_at(&self, id: ElementId, index: usize) -> Option<ElementId> {
        self.semantic_children(id).nth(index)
    }

    pub fn first_child(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).children.last().copied()
    }

    fn sibling_list(&self, id: ElementId) -> &[ElementId] {
        match self.node(id).parent {
            Some(parent) => &self.node(parent).children,
            None if self.top_level.contains(&id) => &self.top_level,
            None => &[],
        }
    }

    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let siblings = self.sibling_list(id);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, id: ElementId) -> Option<ElementId> {
        let siblings = self.sibling_list(id);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.node(id).parent, |p| self.node(*p).parent)
    }

    pub fn is_ancestor(&self, ancestor: ElementId, of: ElementId) -> bool {
        self.ancestors(of).any(|a| a == ancestor)
    }

    /// `root` followed by all its descendants in document order.
    pub fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut all = self.subtree(id);
        all.remove(0);
        all
    }

    pub fn descendants_where<F>(&self, id: ElementId, mut predicate: F) -> Vec<ElementId>
    where
        F: FnMut(&ElementKind) -> bool,
    {
        self.descendants(id).into_iter().filter(|d| predicate(self.kind(*d))).collect()
    }

    /// Every element reachable from the top level matching `predicate`.
    pub fn find_elements<F>(&self, mut predicate: F) -> Vec<ElementId>
    where
        F: FnMut(&ElementKind) -> bool,
    {
        self.top_level
            .iter()
            .flat_map(|t| self.subtree(*t))
            .filter(|e| predicate(self.kind(*e)))
            .collect()
    }

    // ---- key/value pairs and objects ----

    pub fn pair_key(&self, id: ElementId) -> Option<&str> {
        match self.kind(id) {
            ElementKind::KeyValuePair { key } => Some(key.as_str()),
            _ => None,
        }
    }

    /// Value of a key/value pair: its last semantic child.
    pub fn kvp_value(&self, id: ElementId) -> Option<ElementId> {
        if !matches!(self.kind(id), ElementKind::KeyValuePair { .. }) {
            return None;
        }
        self.node(id).children.iter().rev().copied().find(|c| self.kind(*c).is_semantic())
    }

    /// Key/value pairs of an object in order.
    pub fn values(&self, object: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.semantic_children(object).filter(|c| matches!(self.kind(*c), ElementKind::KeyValuePair { .. }))
    }

    pub fn keys(&self, object: ElementId) -> Vec<&str> {
        self.values(object).filter_map(|kvp| self.pair_key(kvp)).collect()
    }

    pub fn object_get_pair(&self, object: ElementId, key: &str) -> Option<ElementId> {
        if !matches!(self.kind(object), ElementKind::Object) {
            return None;
        }
        self.values(object).find(|kvp| self.pair_key(*kvp) == Some(key))
    }

    pub fn object_get(&self, object: ElementId, key: &str) -> Option<ElementId> {
        self.object_get_pair(object, key).and_then(|kvp| self.kvp_value(kvp))
    }

    pub fn contains_key(&self, object: ElementId, key: &str) -> bool {
        self.object_get_pair(object, key).is_some()
    }
}

/// Borrowed view of one element, for read-only traversal.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: ElementId,
}

impl<'a> ElementRef<'a> {
    pub(crate) const fn new(doc: &'a Document, id: ElementId) -> Self {
        Self { doc, id }
    }

    pub const fn id(&self) -> ElementId {
        self.id
    }

    pub const fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a ElementKind {
        self.doc.kind(self.id)
    }

    pub fn element_id(&self) -> Option<&'a str> {
        self.doc.node(self.id).id()
    }

    pub fn tag(&self) -> Option<&'a str> {
        self.doc.node(self.id).tag()
    }

    pub fn parent(&self) -> Option<Self> {
        self.doc.parent(self.id).map(|p| Self::new(self.doc, p))
    }

    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).iter().map(move |c| ElementRef::new(doc, *c))
    }

    pub fn semantic_children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        doc.semantic_children(self.id).map(move |c| ElementRef::new(doc, c))
    }

    pub fn get_at(&self, index: usize) -> Option<Self> {
        self.doc.get_at(self.id, index).map(|c| Self::new(self.doc, c))
    }

    /// Object member lookup.
    pub fn get(&self, key: &str) -> Option<Self> {
        self.doc.object_get(self.id, key).map(|c| Self::new(self.doc, c))
    }

    pub fn key(&self) -> Option<&'a str> {
        self.doc.pair_key(self.id)
    }

    /// Value of a key/value pair.
    pub fn value(&self) -> Option<Self> {
        self.doc.kvp_value(self.id).map(|c| Self::new(self.doc, c))
    }

    /// Scalar text; `None` for containers and unresolved references.
    pub fn text(&self) -> Option<String> {
        self.kind().scalar_text()
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef").field("id", &self.id).field("kind", self.kind()).finish()
    }
}
