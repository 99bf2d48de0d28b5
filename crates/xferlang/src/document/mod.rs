//! The parsed document: element arena, root, instructions, warnings and
//! the id/tag indices.

mod clone;
mod edit;
mod navigate;

use std::collections::{BTreeSet, HashMap};

use compact_str::CompactString;

use crate::element::{ElementId, ElementKind, Node};
use crate::error::{Error, ErrorCode, Result};
use crate::pi::{DocumentMetadata, Instruction, InstructionKind};
use crate::serializer::{self, SerializeOptions};
use crate::warning::{Warning, WarningKind};

pub use navigate::ElementRef;

/// An XferLang document.
///
/// All elements live in one arena and are addressed by [`ElementId`].
/// Removed elements stay in the arena but are detached from the tree and
/// dropped from the indices.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<ElementId>,
    top_level: Vec<ElementId>,
    instructions: Vec<ElementId>,
    warnings: Vec<Warning>,
    ids: HashMap<CompactString, ElementId>,
    tags: HashMap<CompactString, BTreeSet<ElementId>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached element.
    pub fn create(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn node(&self, id: ElementId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: ElementId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: ElementId) -> &ElementKind {
        &self.nodes[id.index()].kind
    }

    /// Mutable access to an element's payload. Changing a value's variant
    /// inside a typed array is not checked here.
    pub fn kind_mut(&mut self, id: ElementId) -> &mut ElementKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn element(&self, id: ElementId) -> ElementRef<'_> {
        ElementRef::new(self, id)
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn root_element(&self) -> Option<ElementRef<'_>> {
        self.root.map(|id| self.element(id))
    }

    /// Top-level items in document order: leading/trailing comments and
    /// instructions plus the root.
    pub fn top_level(&self) -> &[ElementId] {
        &self.top_level
    }

    /// Every processing instruction encountered while parsing, in order.
    pub fn processing_instructions(&self) -> &[ElementId] {
        &self.instructions
    }

    pub fn instruction(&self, id: ElementId) -> Option<&Instruction> {
        match self.kind(id) {
            ElementKind::ProcessingInstruction(pi) => Some(pi),
            _ => None,
        }
    }

    pub(crate) fn instruction_mut(&mut self, id: ElementId) -> Option<&mut Instruction> {
        match self.kind_mut(id) {
            ElementKind::ProcessingInstruction(pi) => Some(pi),
            _ => None,
        }
    }

    pub(crate) fn record_instruction(&mut self, id: ElementId) {
        self.instructions.push(id);
    }

    /// Payload value of an instruction: the value of its keyed payload pair.
    pub fn instruction_value(&self, id: ElementId) -> Option<ElementId> {
        let payload = self.node(id).children.first().copied()?;
        self.kvp_value(payload)
    }

    /// Metadata from the first `document` instruction, if any.
    pub fn metadata(&self) -> Option<DocumentMetadata> {
        self.instructions
            .iter()
            .copied()
            .filter(|pi| matches!(self.instruction(*pi).map(|i| &i.kind), Some(InstructionKind::Document)))
            .find_map(|pi| self.instruction_value(pi))
            .map(|value| DocumentMetadata::from_element(self, value))
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn warnings_of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub(crate) fn push_warning(&mut self, warning: Warning) -> usize {
        tracing::debug!(kind = ?warning.kind, message = %warning.message, "document warning");
        self.warnings.push(warning);
        self.warnings.len() - 1
    }

    pub(crate) fn warning_mut(&mut self, index: usize) -> Option<&mut Warning> {
        self.warnings.get_mut(index)
    }

    /// Append a top-level item. The first semantic item becomes the root;
    /// a second one is rejected.
    pub fn push_top_level(&mut self, id: ElementId) -> Result<()> {
        if self.kind(id).is_semantic() {
            if self.root.is_some() {
                return Err(Error::from_code(
                    ErrorCode::MultipleRoots,
                    "A document can only have one root element",
                ));
            }
            self.detach(id);
            self.index_subtree(id)?;
            self.root = Some(id);
        } else {
            self.detach(id);
            self.index_subtree(id)?;
        }
        self.top_level.push(id);
        Ok(())
    }

    /// Insert a top-level item at `index` (clamped).
    pub fn insert_top_level(&mut self, index: usize, id: ElementId) -> Result<()> {
        self.push_top_level(id)?;
        if let Some(last) = self.top_level.pop() {
            self.top_level.insert(index.min(self.top_level.len()), last);
        }
        Ok(())
    }

    /// Replace (or set) the root element, keeping its top-level position.
    pub fn set_root(&mut self, id: ElementId) -> Result<()> {
        if !self.kind(id).is_semantic() {
            return Err(Error::from_code(
                ErrorCode::InvalidOperation,
                format!("A {} cannot be the document root", self.kind(id).name()),
            ));
        }
        match self.root {
            Some(old) if old == id => Ok(()),
            Some(old) => {
                self.unindex_subtree(old);
                if let Err(err) = self.index_subtree(id) {
                    self.index_subtree(old)?;
                    return Err(err);
                }
                self.detach(id);
                let pos = self.top_level.iter().position(|t| *t == old).unwrap_or(self.top_level.len());
                self.top_level.retain(|t| *t != old);
                self.top_level.insert(pos.min(self.top_level.len()), id);
                self.root = Some(id);
                Ok(())
            }
            None => self.push_top_level(id),
        }
    }

    // ---- id / tag assignment ----

    /// Assign an element's id. Empty and duplicate ids are rejected;
    /// reassigning replaces the element's previous id.
    pub fn set_id(&mut self, element: ElementId, id: &str) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::from_code(ErrorCode::EmptyId, "Element id cannot be empty"));
        }
        if let Some(existing) = self.ids.get(id)
            && *existing != element
        {
            return Err(Error::from_code(
                ErrorCode::DuplicateId,
                format!("Duplicate element id '{id}'"),
            ));
        }
        if let Some(old) = self.node_mut(element).id.take()
            && self.ids.get(&old) == Some(&element)
        {
            self.ids.remove(&old);
        }
        let id = CompactString::from(id);
        self.ids.insert(id.clone(), element);
        self.node_mut(element).id = Some(id);
        Ok(())
    }

    pub fn clear_id(&mut self, element: ElementId) {
        if let Some(old) = self.node_mut(element).id.take()
            && self.ids.get(&old) == Some(&element)
        {
            self.ids.remove(&old);
        }
    }

    /// Assign an element's single tag. An empty tag is ignored; a second
    /// tag is rejected.
    pub fn set_tag(&mut self, element: ElementId, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(());
        }
        if let Some(existing) = &self.node(element).tag {
            return Err(Error::from_code(
                ErrorCode::DuplicateTag,
                format!(
                    "Element already has tag '{existing}'. Cannot assign tag '{tag}' because elements can only have one tag"
                ),
            ));
        }
        let tag = CompactString::from(tag);
        self.tags.entry(tag.clone()).or_default().insert(element);
        self.node_mut(element).tag = Some(tag);
        Ok(())
    }

    pub fn clear_tag(&mut self, element: ElementId) {
        if let Some(old) = self.node_mut(element).tag.take()
            && let Some(set) = self.tags.get_mut(&old)
        {
            set.remove(&element);
            if set.is_empty() {
                self.tags.remove(&old);
            }
        }
    }

    // ---- index queries ----

    pub fn find_by_id(&self, id: &str) -> Option<ElementId> {
        self.ids.get(id).copied()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<ElementId> {
        self.tags.get(tag).map(|set| set.iter().copied().collect()).unwrap_or_default()
    }

    /// Elements carrying any of the given tags.
    pub fn elements_by_any_tag(&self, tags: &[&str]) -> Vec<ElementId> {
        let set: BTreeSet<ElementId> =
            tags.iter().filter_map(|t| self.tags.get(*t)).flatten().copied().collect();
        set.into_iter().collect()
    }

    /// Elements carrying every one of the given tags. With the single-tag
    /// rule this is only non-empty for one distinct tag.
    pub fn elements_by_all_tags(&self, tags: &[&str]) -> Vec<ElementId> {
        let Some((first, rest)) = tags.split_first() else {
            return Vec::new();
        };
        self.elements_by_tag(first)
            .into_iter()
            .filter(|e| rest.iter().all(|t| self.tags.get(*t).is_some_and(|s| s.contains(e))))
            .collect()
    }

    pub fn all_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tags.keys().map(CompactString::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn tag_count(&self, tag: &str) -> usize {
        self.tags.get(tag).map_or(0, BTreeSet::len)
    }

    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.keys().map(CompactString::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Add the ids and tags of a subtree to the indices, failing before any
    /// change if an id is taken by a different element.
    pub(crate) fn index_subtree(&mut self, root: ElementId) -> Result<()> {
        let subtree = self.subtree(root);
        for node in &subtree {
            if let Some(id) = &self.node(*node).id
                && let Some(owner) = self.ids.get(id)
                && owner != node
            {
                return Err(Error::from_code(
                    ErrorCode::DuplicateId,
                    format!("Duplicate element id '{id}'"),
                ));
            }
        }
        for node in subtree {
            let n = &self.nodes[node.index()];
            if let Some(id) = n.id.clone() {
                self.ids.insert(id, node);
            }
            if let Some(tag) = n.tag.clone() {
                self.tags.entry(tag).or_default().insert(node);
            }
        }
        Ok(())
    }

    pub(crate) fn unindex_subtree(&mut self, root: ElementId) {
        for node in self.subtree(root) {
            let n = &self.nodes[node.index()];
            if let Some(id) = &n.id
                && self.ids.get(id) == Some(&node)
            {
                self.ids.remove(id);
            }
            if let Some(tag) = &n.tag
                && let Some(set) = self.tags.get_mut(tag)
            {
                set.remove(&node);
                if set.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }

    /// Serialize with the default options.
    pub fn to_text(&self) -> String {
        serializer::to_text(self, &SerializeOptions::default())
    }

    pub fn to_text_with(&self, options: &SerializeOptions) -> String {
        serializer::to_text(self, options)
    }

    pub fn element_to_text(&self, id: ElementId, options: &SerializeOptions) -> String {
        serializer::element_to_text(self, id, options)
    }
}
