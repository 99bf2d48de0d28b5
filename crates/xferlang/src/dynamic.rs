//! Dynamic values `<|NAME|>` and the sources that provide them.
//!
//! A `dynamicSource` instruction configures, per name, either a constant or
//! a `sourceType value` pair. Source types are dispatched through a
//! [`DynamicSourceRegistry`]; names without configuration fall back to the
//! process environment.

use std::collections::HashMap;
use std::sync::Arc;

use compact_str::CompactString;

use crate::Document;
use crate::element::{ElementId, ElementKind};
use crate::error::{Error, ErrorCode, Result};

/// Produces a value from a source-specific argument (variable name, path, ...).
pub type SourceHandler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Source-type name to handler. Ships `const`, `env` and `file`.
#[derive(Clone)]
pub struct DynamicSourceRegistry {
    handlers: HashMap<String, SourceHandler>,
}

impl Default for DynamicSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicSourceRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("const", |value| Some(value.to_string()));
        registry.register("env", |name| std::env::var(name).ok());
        registry.register("file", |path| match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::debug!(path, error = %err, "file source unavailable");
                None
            }
        });
        registry
    }

    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register<F>(&mut self, source_type: &str, handler: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.handlers.insert(source_type.to_lowercase(), Arc::new(handler));
    }

    pub fn unregister(&mut self, source_type: &str) -> bool {
        self.handlers.remove(&source_type.to_lowercase()).is_some()
    }

    pub fn contains(&self, source_type: &str) -> bool {
        self.handlers.contains_key(&source_type.to_lowercase())
    }

    pub fn source_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `None` if the type is unknown or the handler produced nothing.
    pub fn resolve(&self, source_type: &str, argument: &str) -> Option<String> {
        let handler = self.handlers.get(&source_type.to_lowercase())?;
        handler(argument)
    }
}

/// How one dynamic name is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Constant(String),
    Handler { source_type: CompactString, argument: String },
}

/// Per-document configuration collected from `dynamicSource` instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfigurations {
    entries: HashMap<String, SourceConfig>,
}

impl SourceConfigurations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, config: SourceConfig) {
        self.entries.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a `dynamicSource` payload object. Later entries for the same
    /// name replace earlier ones.
    pub fn extend_from_object(&mut self, doc: &Document, object: ElementId) -> Result<()> {
        for kvp in doc.values(object) {
            let (Some(name), Some(value)) = (doc.pair_key(kvp), doc.kvp_value(kvp)) else {
                continue;
            };
            let config = match doc.kind(value) {
                ElementKind::KeyValuePair { key } => {
                    let argument = doc.kvp_value(value).and_then(|v| doc.kind(v).scalar_text());
                    let Some(argument) = argument else {
                        return Err(Error::from_code(
                            ErrorCode::InvalidInstruction,
                            format!("Dynamic source '{name}' of type '{key}' needs a scalar argument"),
                        ));
                    };
                    SourceConfig::Handler { source_type: key.clone(), argument }
                }
                other => match other.scalar_text() {
                    Some(text) => SourceConfig::Constant(text),
                    None => {
                        return Err(Error::from_code(
                            ErrorCode::InvalidInstruction,
                            format!("Dynamic source '{name}' cannot be a {}", other.name()),
                        ));
                    }
                },
            };
            tracing::debug!(name, ?config, "configured dynamic source");
            self.entries.insert(name.to_string(), config);
        }
        Ok(())
    }
}

/// Resolves a dynamic name to its value.
pub trait DynamicSourceResolver: Send + Sync {
    fn resolve(&self, name: &str, sources: &SourceConfigurations) -> Option<String>;
}

/// Configured source first, then the environment variable of the same name.
#[derive(Clone, Default)]
pub struct DefaultDynamicSourceResolver {
    registry: DynamicSourceRegistry,
}

impl DefaultDynamicSourceResolver {
    pub fn new(registry: DynamicSourceRegistry) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &DynamicSourceRegistry {
        &self.registry
    }
}

impl DynamicSourceResolver for DefaultDynamicSourceResolver {
    fn resolve(&self, name: &str, sources: &SourceConfigurations) -> Option<String> {
        match sources.get(name) {
            Some(SourceConfig::Constant(value)) => Some(value.clone()),
            Some(SourceConfig::Handler { source_type, argument }) => {
                let value = self.registry.resolve(source_type, argument);
                if value.is_none() {
                    tracing::debug!(name, %source_type, "dynamic source produced no value");
                }
                value
            }
            None => std::env::var(name).ok(),
        }
    }
}
