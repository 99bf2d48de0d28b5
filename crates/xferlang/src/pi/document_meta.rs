use std::collections::BTreeMap;

use crate::Document;
use crate::element::{DateTimeValue, ElementId, ElementKind};
use crate::error::Result;
use crate::pi::InstructionKind;

/// Contents of the `document` instruction.
///
/// Well-known fields are typed; anything else lands in `custom` as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub xferlang: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub id: Option<String>,
    pub author: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub profile: Option<String>,
    pub environment: Option<String>,
    pub license: Option<String>,
    pub created_at: Option<DateTimeValue>,
    pub updated_at: Option<DateTimeValue>,
    pub custom: BTreeMap<String, String>,
}

fn text_of(doc: &Document, id: ElementId) -> Option<String> {
    doc.kind(id).scalar_text()
}

fn list_of(doc: &Document, id: ElementId) -> Vec<String> {
    match doc.kind(id) {
        ElementKind::Array { .. } | ElementKind::Tuple => {
            doc.semantic_children(id).filter_map(|c| text_of(doc, c)).collect()
        }
        _ => text_of(doc, id).into_iter().collect(),
    }
}

fn date_of(doc: &Document, id: ElementId) -> Option<DateTimeValue> {
    match doc.kind(id) {
        ElementKind::DateTime { value, .. } => Some(*value),
        other => other.scalar_text().and_then(|s| DateTimeValue::parse(&s).ok()),
    }
}

impl DocumentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read metadata from a `document` payload object.
    pub fn from_element(doc: &Document, object: ElementId) -> Self {
        let mut meta = Self::default();
        for kvp in doc.values(object) {
            let (Some(key), Some(value)) = (doc.pair_key(kvp), doc.kvp_value(kvp)) else {
                continue;
            };
            match key {
                "xferlang" => meta.xferlang = text_of(doc, value),
                "title" => meta.title = text_of(doc, value),
                "description" => meta.description = text_of(doc, value),
                "version" => meta.version = text_of(doc, value),
                "id" => meta.id = text_of(doc, value),
                "author" => meta.author = text_of(doc, value),
                "authors" => meta.authors = list_of(doc, value),
                "tags" => meta.tags = list_of(doc, value),
                "profile" => meta.profile = text_of(doc, value),
                "environment" => meta.environment = text_of(doc, value),
                "license" => meta.license = text_of(doc, value),
                "createdAt" => meta.created_at = date_of(doc, value),
                "updatedAt" => meta.updated_at = date_of(doc, value),
                other => {
                    let text = text_of(doc, value)
                        .unwrap_or_else(|| doc.element_to_text(value, &Default::default()));
                    meta.custom.insert(other.to_string(), text);
                }
            }
        }
        meta
    }

    pub fn custom(&self, key: &str) -> Option<&str> {
        self.custom.get(key).map(String::as_str)
    }

    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(key.into(), value.into());
    }

    pub fn remove_custom(&mut self, key: &str) -> Option<String> {
        self.custom.remove(key)
    }

    /// Build the payload object inside `doc`.
    pub fn to_element(&self, doc: &mut Document) -> Result<ElementId> {
        let object = doc.create(ElementKind::Object);
        let texts = [
            ("xferlang", &self.xferlang),
            ("title", &self.title),
            ("description", &self.description),
            ("version", &self.version),
            ("id", &self.id),
            ("author", &self.author),
        ];
        for (key, value) in texts {
            if let Some(v) = value {
                let el = doc.create(ElementKind::string(v.as_str()));
                doc.add_pair(object, key, el)?;
            }
        }
        for (key, list) in [("authors", &self.authors), ("tags", &self.tags)] {
            if list.is_empty() {
                continue;
            }
            let arr = doc.create(ElementKind::empty_array());
            for item in list {
                let el = doc.create(ElementKind::string(item.as_str()));
                doc.add(arr, el)?;
            }
            doc.add_pair(object, key, arr)?;
        }
        for (key, value) in [("profile", &self.profile), ("environment", &self.environment), ("license", &self.license)] {
            if let Some(v) = value {
                let el = doc.create(ElementKind::string(v.as_str()));
                doc.add_pair(object, key, el)?;
            }
        }
        for (key, value) in [("createdAt", self.created_at), ("updatedAt", self.updated_at)] {
            if let Some(v) = value {
                let el = doc.create(ElementKind::date_time(v));
                doc.add_pair(object, key, el)?;
            }
        }
        for (key, value) in &self.custom {
            let el = doc.create(ElementKind::string(value.as_str()));
            doc.add_pair(object, key, el)?;
        }
        Ok(object)
    }
}

impl Document {
    /// Attach metadata as a leading `document` instruction, replacing the
    /// payload of an existing one.
    pub fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<ElementId> {
        let object = metadata.to_element(self)?;
        let existing = self.processing_instructions().iter().copied().find(|pi| {
            matches!(self.instruction(*pi).map(|i| &i.kind), Some(InstructionKind::Document))
                && (self.parent(*pi).is_some() || self.top_level().contains(pi))
        });
        if let Some(pi) = existing {
            if let Some(payload) = self.first_child(pi)
                && let Some(old) = self.kvp_value(payload)
            {
                self.replace_child(payload, old, object)?;
            }
            return Ok(pi);
        }
        let pi = self.create_instruction("document", InstructionKind::Document, object)?;
        if let Some(root) = self.root()
            && let Some(instr) = self.instruction_mut(pi)
        {
            instr.target = Some(root);
        }
        self.insert_top_level(0, pi)?;
        self.record_instruction(pi);
        Ok(pi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_through_elements() {
        let mut meta = DocumentMetadata::new();
        meta.title = Some("Inventory".into());
        meta.tags = vec!["a".into(), "b".into()];
        meta.set_custom("owner", "ops");

        let mut doc = Document::new();
        let obj = meta.to_element(&mut doc).unwrap();
        let read = DocumentMetadata::from_element(&doc, obj);
        assert_eq!(read, meta);
        assert_eq!(read.custom("owner"), Some("ops"));
    }

    #[test]
    fn set_metadata_adds_leading_instruction() {
        let mut doc = Document::new();
        let root = doc.create(ElementKind::Object);
        doc.push_top_level(root).unwrap();
        let mut meta = DocumentMetadata::new();
        meta.version = Some("1.0".into());
        let pi = doc.set_metadata(&meta).unwrap();
        assert_eq!(doc.top_level()[0], pi);
        assert_eq!(doc.metadata().unwrap().version.as_deref(), Some("1.0"));
    }
}
