use super::Document;
use crate::element::ElementId;

impl Document {
    /// Structural copy of a subtree as a new detached element.
    ///
    /// Tags are copied (and indexed); ids are not, since they must stay
    /// unique within the document.
    pub fn deep_clone(&mut self, source: ElementId) -> ElementId {
        let kind = self.kind(source).clone();
        let tag = self.node(source).tag.clone();
        let copy = self.create(kind);
        if let Some(tag) = tag {
            self.tags.entry(tag.clone()).or_default().insert(copy);
            self.node_mut(copy).tag = Some(tag);
        }
        let children: Vec<ElementId> = self.node(source).children.to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.node_mut(child_copy).parent = Some(copy);
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }
}
