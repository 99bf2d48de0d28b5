//! Rendering documents and elements back to XferLang text.
//!
//! Text literals get the smallest delimiter run that keeps their content
//! intact ([`delimiter::for_text`]). In compact output a space is only
//! written where the next token would otherwise run into the previous one.

use std::borrow::Cow;
use std::sync::{LazyLock, PoisonError, RwLock};

use bitflags::bitflags;
use rust_decimal::Decimal;

use crate::Document;
use crate::element::delimiter::{self, DelimiterStyle, is_bare_key, is_embedded_sigil, is_key_char, is_terminator};
use crate::element::{ElementId, ElementKind};
use crate::pi::InstructionKind;

bitflags! {
    /// Incidental whitespace added around structure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Formatting: u8 {
        /// Newline and one indent unit per depth for container children.
        const INDENTED = 1;
        /// Spaces inside container and instruction delimiters.
        const SPACED = 1 << 1;
        const PRETTY = Self::INDENTED.bits() | Self::SPACED.bits();
    }
}

impl Formatting {
    pub const COMPACT: Self = Self::empty();
}

static DEFAULT_OPTIONS: LazyLock<RwLock<SerializeOptions>> = LazyLock::new(|| RwLock::new(SerializeOptions::compact()));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub formatting: Formatting,
    pub indent_char: char,
    pub indent_width: usize,
}

impl Default for SerializeOptions {
    /// The process-wide default, compact unless changed with
    /// [`SerializeOptions::set_default`].
    fn default() -> Self {
        DEFAULT_OPTIONS.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SerializeOptions {
    pub const fn compact() -> Self {
        Self { formatting: Formatting::COMPACT, indent_char: ' ', indent_width: 2 }
    }

    pub const fn pretty() -> Self {
        Self { formatting: Formatting::PRETTY, indent_char: ' ', indent_width: 2 }
    }

    #[must_use]
    pub const fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    #[must_use]
    pub const fn with_indent(mut self, indent_char: char, indent_width: usize) -> Self {
        self.indent_char = indent_char;
        self.indent_width = indent_width;
        self
    }

    pub fn set_default(options: Self) {
        *DEFAULT_OPTIONS.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    pub fn reset_default() {
        Self::set_default(Self::compact());
    }

    const fn indented(&self) -> bool {
        self.formatting.contains(Formatting::INDENTED)
    }

    const fn spaced(&self) -> bool {
        self.formatting.contains(Formatting::SPACED)
    }
}

/// How the last written token ends, i.e. what the parser would keep
/// consuming if the next token followed without a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    /// Ends with a closing delimiter.
    Closed,
    /// Bare key or compact dereference: continues over key characters.
    Key,
    /// Compact scalar token: continues until whitespace or a terminator.
    Token,
}

/// Keep evaluated interpolated text from being evaluated again on reparse:
/// a `<` that would open an embedded element and a `_` that could start a
/// `_name_` token are each written as an embedded string.
fn escape_interpolated(content: &str) -> Cow<'_, str> {
    let chars: Vec<char> = content.chars().collect();
    let special = |i: usize| {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '<' => next.is_some_and(is_embedded_sigil),
            '_' => {
                let prev = i.checked_sub(1).map(|p| chars[p]);
                !prev.is_some_and(|p| p.is_ascii_alphanumeric()) && next.is_some_and(|n| n.is_ascii_alphabetic())
            }
            _ => false,
        }
    };
    if !(0..chars.len()).any(special) {
        return Cow::Borrowed(content);
    }
    let mut out = String::with_capacity(content.len() + 8);
    for (i, c) in chars.iter().enumerate() {
        if special(i) {
            out.push_str("<\"");
            out.push(*c);
            out.push_str("\">");
        } else {
            out.push(*c);
        }
    }
    Cow::Owned(out)
}

fn decimal_text(value: &Decimal) -> String {
    let text = value.to_string();
    if value.is_zero() && value.is_sign_negative() && !text.starts_with('-') {
        format!("-{text}")
    } else {
        text
    }
}

/// Shortest round-trip form, switching to exponent notation for very
/// large or very small magnitudes.
fn double_text(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && magnitude > 0.0 && !(1e-5..1e16).contains(&magnitude) {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    out: String,
    tail: Tail,
}

pub fn to_text(doc: &Document, options: &SerializeOptions) -> String {
    let mut w = Writer::new(doc, options);
    let items: Vec<ElementId> = doc.top_level().iter().copied().filter(|id| w.is_visible(*id)).collect();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 && options.indented() {
            w.newline(0);
        } else if i > 0 && options.spaced() {
            w.space();
        }
        w.element(item, 0);
    }
    w.out
}

pub fn element_to_text(doc: &Document, id: ElementId, options: &SerializeOptions) -> String {
    let mut w = Writer::new(doc, options);
    w.element(id, 0);
    w.out
}

impl<'a> Writer<'a> {
    fn new(doc: &'a Document, options: &'a SerializeOptions) -> Self {
        Self { doc, options, out: String::new(), tail: Tail::Closed }
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.doc.instruction(id).is_none_or(|pi| !pi.suppress_serialization)
    }

    fn emit(&mut self, text: &str, tail: Tail) {
        if let Some(first) = text.chars().next() {
            let joins = match self.tail {
                Tail::Closed => false,
                Tail::Key => is_key_char(first),
                Tail::Token => !(first.is_whitespace() || is_terminator(first)),
            };
            if joins {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
        self.tail = tail;
    }

    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
        self.tail = Tail::Closed;
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        let unit = self.options.indent_width * depth;
        self.out.extend(std::iter::repeat_n(self.options.indent_char, unit));
        self.tail = Tail::Closed;
    }

    fn text_literal(&mut self, delim: char, content: &str) {
        let d = delimiter::for_text(delim, delim, content);
        self.delimited(d.style, &d.opening_run(), content);
    }

    fn delimited(&mut self, style: DelimiterStyle, run: &str, content: &str) {
        let mut text = String::with_capacity(content.len() + run.len() * 2 + 3);
        if style == DelimiterStyle::Explicit {
            text.push('<');
            text.push_str(run);
            if run.chars().next().is_some_and(|c| delimiter::needs_leading_pad(content, c)) {
                text.push(' ');
            }
            text.push_str(content);
            text.push_str(run);
            text.push('>');
        } else {
            text.push_str(run);
            text.push_str(content);
            text.push_str(run);
        }
        self.emit(&text, Tail::Closed);
    }

    /// `<!id ...!>` / `<!tag ...!>` for an id or tag that no visible
    /// instruction in front of the element carries.
    fn annotations(&mut self, id: ElementId, depth: usize) {
        let doc = self.doc;
        let node = doc.node(id);
        let carried = |kind: fn(&InstructionKind) -> bool, text: &str| {
            doc.processing_instructions().iter().any(|pi| {
                doc.instruction(*pi)
                    .is_some_and(|i| i.target == Some(id) && kind(&i.kind) && !i.suppress_serialization)
                    && doc.instruction_value(*pi).and_then(|v| doc.kind(v).scalar_text()).as_deref() == Some(text)
            })
        };
        let missing_id = node.id().filter(|v| !carried(|k| matches!(k, InstructionKind::Id), v)).map(str::to_string);
        let missing_tag =
            node.tag().filter(|v| !carried(|k| matches!(k, InstructionKind::Tag), v)).map(str::to_string);
        for (name, value) in [("id", missing_id), ("tag", missing_tag)] {
            if let Some(value) = value {
                self.open_instruction();
                self.emit(name, Tail::Key);
                if self.options.spaced() {
                    self.space();
                }
                self.text_literal('"', &value);
                self.close_instruction();
                self.separator(depth);
            }
        }
    }

    fn open_instruction(&mut self) {
        self.emit("<!", Tail::Closed);
        if self.options.spaced() {
            self.space();
        }
    }

    fn close_instruction(&mut self) {
        if self.options.spaced() {
            self.space();
        }
        self.emit("!>", Tail::Closed);
    }

    /// Whitespace between siblings.
    fn separator(&mut self, depth: usize) {
        if self.options.indented() {
            self.newline(depth);
        } else if self.options.spaced() {
            self.space();
        }
    }

    fn element(&mut self, id: ElementId, depth: usize) {
        let doc = self.doc;
        let kind = doc.kind(id);
        if kind.is_semantic() {
            self.annotations(id, depth);
        }
        match kind {
            ElementKind::String(s) => self.text_literal('"', s),
            ElementKind::Interpolated(s) => self.text_literal('\'', &escape_interpolated(s)),
            ElementKind::Identifier(s) => self.text_literal(':', s),
            ElementKind::Keyword(s) => self.text_literal('=', s),
            ElementKind::Dynamic { name, .. } => self.text_literal('|', name),
            ElementKind::Comment(s) => {
                let d = delimiter::for_text('/', '/', s);
                self.delimited(DelimiterStyle::Explicit, &d.opening_run(), s);
            }
            ElementKind::Character(c) => self.emit(&format!("\\${:X}", u32::from(*c)), Tail::Token),
            ElementKind::Reference(name) => {
                if name.chars().all(is_key_char) && !name.ends_with('_') {
                    self.emit(&format!("_{name}"), Tail::Key);
                } else {
                    self.emit(&format!("<_{name}_>"), Tail::Closed);
                }
            }
            ElementKind::Null => self.emit("?", Tail::Closed),
            ElementKind::Empty => self.emit("<>", Tail::Closed),
            ElementKind::Integer(v) => self.emit(&v.to_string(), Tail::Token),
            ElementKind::Long(v) => self.emit(&format!("&{v}"), Tail::Token),
            ElementKind::Decimal(v) => self.emit(&format!("*{}", decimal_text(v)), Tail::Token),
            ElementKind::Double(v) => self.emit(&format!("^{}", double_text(*v)), Tail::Token),
            ElementKind::Boolean(v) => self.emit(&format!("~{v}"), Tail::Token),
            ElementKind::DateTime { value, handling } => {
                self.emit(&format!("@{}@", value.render(*handling)), Tail::Token);
            }
            ElementKind::Object => self.container(id, '{', '}', depth),
            ElementKind::Array { .. } => self.container(id, '[', ']', depth),
            ElementKind::Tuple => self.container(id, '(', ')', depth),
            ElementKind::KeyValuePair { key } => self.pair(id, key, depth),
            ElementKind::ProcessingInstruction(_) => {
                self.open_instruction();
                if let Some(payload) = doc.children(id).first() {
                    self.element(*payload, depth);
                }
                self.close_instruction();
            }
        }
    }

    fn pair(&mut self, id: ElementId, key: &str, depth: usize) {
        if is_bare_key(key) {
            self.emit(key, Tail::Key);
        } else {
            self.text_literal('=', key);
        }
        let children: Vec<ElementId> =
            self.doc.children(id).iter().copied().filter(|c| self.is_visible(*c)).collect();
        for child in children {
            if self.options.spaced() {
                self.space();
            }
            self.element(child, depth);
        }
    }

    fn container(&mut self, id: ElementId, open: char, close: char, depth: usize) {
        self.emit(open.encode_utf8(&mut [0; 4]), Tail::Closed);
        let children: Vec<ElementId> =
            self.doc.children(id).iter().copied().filter(|c| self.is_visible(*c)).collect();
        if children.is_empty() {
            self.emit(close.encode_utf8(&mut [0; 4]), Tail::Closed);
            return;
        }
        for child in children {
            if self.options.indented() {
                self.newline(depth + 1);
            } else if self.options.spaced() {
                self.space();
            }
            self.element(child, depth + 1);
        }
        if self.options.indented() {
            self.newline(depth);
        } else if self.options.spaced() {
            self.space();
        }
        self.emit(close.encode_utf8(&mut [0; 4]), Tail::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        let root = doc.create(ElementKind::Object);
        let name = doc.create(ElementKind::string("Alice"));
        let age = doc.create(ElementKind::Integer(30));
        doc.add_pair(root, "name", name).unwrap();
        doc.add_pair(root, "age", age).unwrap();
        doc.push_top_level(root).unwrap();
        doc
    }

    #[test]
    fn compact_output_only_separates_where_needed() {
        let doc = sample();
        assert_eq!(to_text(&doc, &SerializeOptions::compact()), "{name\"Alice\"age 30}");
    }

    #[test]
    fn spaced_output() {
        let doc = sample();
        let opts = SerializeOptions::compact().with_formatting(Formatting::SPACED);
        assert_eq!(to_text(&doc, &opts), "{ name \"Alice\" age 30 }");
    }

    #[test]
    fn pretty_output_uses_indent_settings() {
        let doc = sample();
        let opts = SerializeOptions::pretty().with_indent('\t', 1);
        assert_eq!(to_text(&doc, &opts), "{\n\tname \"Alice\"\n\tage 30\n}");
    }

    #[test]
    fn tokens_that_would_merge_get_a_space() {
        let mut doc = Document::new();
        let tuple = doc.create(ElementKind::Tuple);
        for kind in [ElementKind::Integer(1), ElementKind::Boolean(true), ElementKind::string("x")] {
            let el = doc.create(kind);
            doc.add(tuple, el).unwrap();
        }
        doc.push_top_level(tuple).unwrap();
        assert_eq!(doc.to_text_with(&SerializeOptions::compact()), "(1 ~true \"x\")");
    }

    #[test]
    fn ids_without_instruction_are_annotated() {
        let mut doc = sample();
        let root = doc.root().unwrap();
        doc.set_id(root, "person").unwrap();
        assert_eq!(
            doc.to_text_with(&SerializeOptions::compact()),
            "<!id\"person\"!>{name\"Alice\"age 30}"
        );
    }

    #[test]
    fn doubles_switch_to_exponent_form() {
        assert_eq!(double_text(1e300), "1e300");
        assert_eq!(double_text(-2.5e-7), "-2.5e-7");
        assert_eq!(double_text(2.5), "2.5");
        assert_eq!(double_text(123_456.0), "123456");
        assert_eq!(double_text(-0.0), "-0");
    }

    #[test]
    fn interpolated_escapes_only_live_sequences() {
        assert_eq!(escape_interpolated("a < b and snake_case"), "a < b and snake_case");
        assert_eq!(escape_interpolated("<#1#>"), "<\"<\">#1#>");
        assert_eq!(escape_interpolated("hi _name_"), "hi <\"_\">name_");
        assert_eq!(escape_interpolated("<_x_>"), "<\"<\"><\"_\">x_>");
    }

    #[test]
    fn characters_render_as_hex() {
        let mut doc = Document::new();
        let c = doc.create(ElementKind::Character('A'));
        assert_eq!(element_to_text(&doc, c, &SerializeOptions::compact()), "\\$41");
    }
}
