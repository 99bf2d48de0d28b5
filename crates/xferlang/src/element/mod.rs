//! Element kinds and per-node data of the document arena.
//!
//! Every node of a [`Document`](crate::Document) is an [`ElementKind`] plus
//! the bookkeeping in [`Node`]: id, tag, parent link and ordered children.
//! Structure (children, parents) is only changed through the document's
//! tree-edit operations so that the id/tag indices stay consistent.

pub mod delimiter;
pub mod value;

use compact_str::CompactString;
use rust_decimal::Decimal;
use smallvec::SmallVec;

pub use delimiter::{Delimiter, DelimiterStyle};
pub use value::{DateTimeHandling, DateTimeValue, ElementType};

use crate::pi::Instruction;

/// Handle of a node inside a [`Document`](crate::Document) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of element variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    String(String),
    /// Text whose embedded elements and `_name_` tokens were evaluated at parse time.
    Interpolated(String),
    Identifier(CompactString),
    Keyword(CompactString),
    Character(char),
    /// `<|NAME|>`; `value` is what the configured source produced, if anything.
    Dynamic {
        name: CompactString,
        value: Option<String>,
    },
    /// Dereference placeholder `_name` that did not resolve.
    Reference(CompactString),
    Null,
    Empty,
    Comment(String),
    Integer(i32),
    Long(i64),
    Decimal(Decimal),
    Double(f64),
    Boolean(bool),
    DateTime {
        value: DateTimeValue,
        handling: DateTimeHandling,
    },
    Array {
        element_type: Option<ElementType>,
    },
    Tuple,
    Object,
    /// Children are `[instructions..., value]`; the value is the last semantic child.
    KeyValuePair {
        key: CompactString,
    },
    /// Children are `[payload]` where the payload is a key/value pair keyed by the name.
    ProcessingInstruction(Instruction),
}

impl ElementKind {
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    pub fn date_time(value: DateTimeValue) -> Self {
        Self::DateTime { value, handling: DateTimeHandling::RoundTrip }
    }

    pub const fn empty_array() -> Self {
        Self::Array { element_type: None }
    }

    /// Comments and processing instructions are kept for round-tripping but
    /// do not count as values.
    pub const fn is_semantic(&self) -> bool {
        !matches!(self, Self::Comment(_) | Self::ProcessingInstruction(_))
    }

    /// Whether the node may own children.
    pub const fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Array { .. }
                | Self::Tuple
                | Self::Object
                | Self::KeyValuePair { .. }
                | Self::ProcessingInstruction(_)
        )
    }

    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Tuple | Self::Object)
    }

    /// Type class used for array homogeneity. References, comments and
    /// instructions have none and are accepted by any array.
    pub const fn element_type(&self) -> Option<ElementType> {
        Some(match self {
            Self::String(_)
            | Self::Interpolated(_)
            | Self::Identifier(_)
            | Self::Keyword(_)
            | Self::Dynamic { .. } => ElementType::Text,
            Self::Character(_) => ElementType::Character,
            Self::Integer(_) => ElementType::Integer,
            Self::Long(_) => ElementType::Long,
            Self::Decimal(_) => ElementType::Decimal,
            Self::Double(_) => ElementType::Double,
            Self::Boolean(_) => ElementType::Boolean,
            Self::DateTime { .. } => ElementType::DateTime,
            Self::Null => ElementType::Null,
            Self::Empty => ElementType::Empty,
            Self::KeyValuePair { .. } => ElementType::KeyValuePair,
            Self::Object => ElementType::Object,
            Self::Array { .. } => ElementType::Array,
            Self::Tuple => ElementType::Tuple,
            Self::Reference(_) | Self::Comment(_) | Self::ProcessingInstruction(_) => return None,
        })
    }

    /// Short lower-case name of the variant, used in messages and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Interpolated(_) => "interpolated",
            Self::Identifier(_) => "identifier",
            Self::Keyword(_) => "keyword",
            Self::Character(_) => "character",
            Self::Dynamic { .. } => "dynamic",
            Self::Reference(_) => "dereference",
            Self::Null => "null",
            Self::Empty => "empty",
            Self::Comment(_) => "comment",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Decimal(_) => "decimal",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::DateTime { .. } => "date/time",
            Self::Array { .. } => "array",
            Self::Tuple => "tuple",
            Self::Object => "object",
            Self::KeyValuePair { .. } => "key/value pair",
            Self::ProcessingInstruction(_) => "processing instruction",
        }
    }

    /// Plain text of a scalar, as used by interpolation, tags and operator
    /// string comparison. Containers have none.
    pub fn scalar_text(&self) -> Option<String> {
        Some(match self {
            Self::String(s) | Self::Interpolated(s) | Self::Comment(s) => s.clone(),
            Self::Identifier(s) | Self::Keyword(s) => s.to_string(),
            Self::Character(c) => c.to_string(),
            Self::Dynamic { value, .. } => value.clone().unwrap_or_default(),
            Self::Integer(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Boolean(v) => v.to_string(),
            Self::DateTime { value, handling } => value.render(*handling),
            Self::Null | Self::Empty => String::new(),
            Self::Reference(_)
            | Self::Array { .. }
            | Self::Tuple
            | Self::Object
            | Self::KeyValuePair { .. }
            | Self::ProcessingInstruction(_) => return None,
        })
    }

    /// Whether the value is text-like (usable as an id or tag payload).
    pub const fn is_text(&self) -> bool {
        matches!(
            self,
            Self::String(_) | Self::Interpolated(_) | Self::Identifier(_) | Self::Keyword(_)
        )
    }
}

/// Per-node storage in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: ElementKind,
    pub(crate) id: Option<CompactString>,
    pub(crate) tag: Option<CompactString>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: SmallVec<[ElementId; 4]>,
}

impl Node {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self { kind, id: None, tag: None, parent: None, children: SmallVec::new() }
    }

    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}
