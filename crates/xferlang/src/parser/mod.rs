//! Single-pass recursive-descent parser from XferLang text to a [`Document`].
//!
//! Instructions, bindings and dereferences are handled while parsing: an
//! instruction applies to the next semantic sibling as soon as that sibling
//! has been parsed, `let` binds when it is read, and dereferences resolve
//! against the bindings seen so far.

mod instructions;
mod interpolate;
mod literal;
mod scanner;
mod session;

use core::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::Document;
use crate::chars::CharacterRegistry;
use crate::dynamic::{DefaultDynamicSourceResolver, DynamicSourceResolver};
use crate::error::{Error, ErrorCode, Result};
use crate::pi::InstructionRegistry;
use crate::scripting::{OperatorRegistry, ScriptingContext};

static DEFAULT_OPTIONS: LazyLock<RwLock<ParserOptions>> = LazyLock::new(|| RwLock::new(ParserOptions::builtin()));

/// Registries and switches used by a [`Parser`].
///
/// `ParserOptions::default()` copies the process-wide defaults, which start
/// out as [`ParserOptions::builtin`] and can be replaced with
/// [`ParserOptions::set_default`].
#[derive(Clone)]
pub struct ParserOptions {
    operators: Option<Arc<OperatorRegistry>>,
    context: ScriptingContext,
    instructions: InstructionRegistry,
    characters: CharacterRegistry,
    dynamic_sources: Arc<dyn DynamicSourceResolver>,
    normalize_text: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        DEFAULT_OPTIONS.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("operators", &self.operators.as_ref().map_or("global", |_| "custom"))
            .field("context", &self.context)
            .field("instructions", &self.instructions.names())
            .field("characters", &self.characters)
            .field("normalize_text", &self.normalize_text)
            .finish_non_exhaustive()
    }
}

impl ParserOptions {
    /// Built-in registries, the global operator registry and NFC normalization.
    pub fn builtin() -> Self {
        Self {
            operators: None,
            context: ScriptingContext::new(),
            instructions: InstructionRegistry::new(),
            characters: CharacterRegistry::new(),
            dynamic_sources: Arc::new(DefaultDynamicSourceResolver::default()),
            normalize_text: true,
        }
    }

    /// Replace the process-wide defaults.
    pub fn set_default(options: Self) {
        *DEFAULT_OPTIONS.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Restore the process-wide defaults to [`ParserOptions::builtin`].
    pub fn reset_default() {
        Self::set_default(Self::builtin());
    }

    /// Use `registry` instead of the global operator registry.
    #[must_use]
    pub fn with_operators(mut self, registry: Arc<OperatorRegistry>) -> Self {
        self.operators = Some(registry);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: ScriptingContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: InstructionRegistry) -> Self {
        self.instructions = instructions;
        self
    }

    #[must_use]
    pub fn with_characters(mut self, characters: CharacterRegistry) -> Self {
        self.characters = characters;
        self
    }

    #[must_use]
    pub fn with_dynamic_sources(mut self, resolver: Arc<dyn DynamicSourceResolver>) -> Self {
        self.dynamic_sources = resolver;
        self
    }

    /// Toggle NFC normalization of text content.
    #[must_use]
    pub const fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize_text = enabled;
        self
    }

    pub fn operators(&self) -> &OperatorRegistry {
        self.operators.as_deref().unwrap_or_else(|| OperatorRegistry::global())
    }

    pub const fn context(&self) -> &ScriptingContext {
        &self.context
    }

    pub const fn context_mut(&mut self) -> &mut ScriptingContext {
        &mut self.context
    }

    pub const fn instructions(&self) -> &InstructionRegistry {
        &self.instructions
    }

    pub const fn instructions_mut(&mut self) -> &mut InstructionRegistry {
        &mut self.instructions
    }

    pub const fn characters(&self) -> &CharacterRegistry {
        &self.characters
    }

    pub const fn characters_mut(&mut self) -> &mut CharacterRegistry {
        &mut self.characters
    }

    pub fn dynamic_sources(&self) -> &dyn DynamicSourceResolver {
        self.dynamic_sources.as_ref()
    }

    pub const fn normalizes_text(&self) -> bool {
        self.normalize_text
    }
}

/// Parses XferLang text. Every call produces a fresh [`Document`].
#[derive(Debug, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub const fn options_mut(&mut self) -> &mut ParserOptions {
        &mut self.options
    }

    pub fn parse(&self, text: &str) -> Result<Document> {
        tracing::debug!(len = text.len(), "parsing document");
        session::Session::new(&self.options, text).run()
    }

    /// Parse UTF-8 bytes; a leading byte order mark is skipped.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes).map_err(|err| {
            Error::from_code(ErrorCode::InvalidEncoding, format!("Input is not valid UTF-8: {err}"))
                .with_source(Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>))
        })?;
        self.parse(text)
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        let bytes = std::fs::read(path.as_ref())?;
        self.parse_bytes(&bytes)
    }
}
