use compact_str::CompactString;
use unicode_normalization::UnicodeNormalization;

use super::ParserOptions;
use super::interpolate::substitute_tokens;
use super::literal;
use super::scanner::Scanner;
use crate::Document;
use crate::chars::CharacterRegistry;
use crate::dynamic::SourceConfigurations;
use crate::element::delimiter::{is_embedded_sigil, is_key_char, is_key_start, needs_leading_pad};
use crate::element::{DateTimeValue, ElementId, ElementKind};
use crate::error::{Error, ErrorCode, Position, Result};
use crate::resolver::Resolver;
use crate::scripting::ScriptingEngine;
use crate::serializer::SerializeOptions;
use crate::warning::{Warning, WarningKind};

/// Instructions waiting for the next semantic sibling.
pub(super) type Pending = Vec<(ElementId, Position)>;

/// State of one parse: the document under construction plus the bindings,
/// source configuration and character names collected so far.
pub(super) struct Session<'o> {
    pub(super) options: &'o ParserOptions,
    pub(super) scanner: Scanner,
    pub(super) doc: Document,
    pub(super) resolver: Resolver,
    pub(super) engine: ScriptingEngine,
    pub(super) sources: SourceConfigurations,
    pub(super) characters: CharacterRegistry,
}

fn unexpected_end(what: &str, start: Position) -> Error {
    Error::from_code(ErrorCode::UnexpectedEnd, format!("Unterminated {what}")).at(start)
}

impl<'o> Session<'o> {
    pub(super) fn new(options: &'o ParserOptions, text: &str) -> Self {
        Self {
            options,
            scanner: Scanner::new(text),
            doc: Document::new(),
            resolver: Resolver::new(),
            engine: ScriptingEngine::with_registry(options.context().clone(), options.operators()),
            sources: SourceConfigurations::new(),
            characters: options.characters().clone(),
        }
    }

    pub(super) fn run(mut self) -> Result<Document> {
        let mut pending = Pending::new();
        loop {
            self.scanner.skip_whitespace();
            if self.scanner.at_end() {
                break;
            }
            let pos = self.scanner.position();
            let element = self.parse_element()?;
            if self.is_dropped(element) {
                continue;
            }
            self.doc.push_top_level(element).map_err(|e| e.at(pos))?;
            match self.doc.kind(element) {
                ElementKind::ProcessingInstruction(_) => pending.push((element, pos)),
                ElementKind::Comment(_) => {}
                _ => {
                    let bound = std::mem::take(&mut pending);
                    self.bind_instructions(bound, element)?;
                }
            }
        }
        let root = self.doc.root();
        self.flush_unbound(pending, root)?;
        self.resolver.finish();
        tracing::debug!(
            elements = self.doc.root().map_or(0, |r| self.doc.subtree(r).len()),
            warnings = self.doc.warnings().len(),
            "document parsed"
        );
        Ok(self.doc)
    }

    fn normalize(&self, text: String) -> String {
        if self.options.normalizes_text() && !text.is_ascii() { text.nfc().collect() } else { text }
    }

    /// A key/value pair whose value was removed by a failed `if`.
    fn is_dropped(&self, element: ElementId) -> bool {
        matches!(self.doc.kind(element), ElementKind::KeyValuePair { .. }) && self.doc.kvp_value(element).is_none()
    }

    /// Parse one element at the cursor. The result is detached.
    pub(super) fn parse_element(&mut self) -> Result<ElementId> {
        let pos = self.scanner.position();
        let Some(c) = self.scanner.peek() else {
            return Err(unexpected_end("document, expected an element", pos));
        };
        let kind = match c {
            '{' => return self.parse_container(ElementKind::Object, '}', false),
            '[' => return self.parse_container(ElementKind::empty_array(), ']', false),
            '(' => return self.parse_container(ElementKind::Tuple, ')', false),
            ')' | ']' | '}' => {
                return Err(Error::from_code(ErrorCode::UnbalancedDelimiter, format!("Unexpected '{c}'")).at(pos));
            }
            '<' => return self.parse_explicit(pos),
            '"' => ElementKind::String(self.read_text('"', false, false)?),
            '\'' => ElementKind::Interpolated(self.read_text('\'', false, true)?),
            ':' => ElementKind::Identifier(self.read_text(':', false, false)?.into()),
            '=' => {
                let key = self.read_text('=', false, false)?;
                return self.parse_pair(key.into(), pos);
            }
            '|' => self.dynamic(false)?,
            '_' => return self.dereference(false, pos),
            '?' => {
                self.scanner.bump();
                ElementKind::Null
            }
            '#' | '&' | '*' | '^' | '~' | '@' | '\\' => self.scalar(c, false, pos)?,
            '-' | '+' if self.scanner.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.implicit_integer(pos)?,
            c if c.is_ascii_digit() => self.implicit_integer(pos)?,
            c if is_key_start(c) => {
                let key = self.read_key();
                return self.parse_pair(key, pos);
            }
            other => {
                return Err(Error::from_code(
                    ErrorCode::UnexpectedCharacter,
                    format!("Unexpected character '{other}'"),
                )
                .at(pos));
            }
        };
        Ok(self.doc.create(kind))
    }

    fn parse_explicit(&mut self, pos: Position) -> Result<ElementId> {
        let Some(next) = self.scanner.peek_at(1) else {
            return Err(unexpected_end("element after '<'", pos));
        };
        let kind = match next {
            '>' => {
                self.scanner.advance(2);
                ElementKind::Empty
            }
            '!' => return self.parse_instruction(pos),
            '{' => return self.parse_container(ElementKind::Object, '}', true),
            '[' => return self.parse_container(ElementKind::empty_array(), ']', true),
            '(' => return self.parse_container(ElementKind::Tuple, ')', true),
            '/' => ElementKind::Comment(self.read_text('/', true, false)?),
            '"' => ElementKind::String(self.read_text('"', true, false)?),
            '\'' => ElementKind::Interpolated(self.read_text('\'', true, true)?),
            ':' => ElementKind::Identifier(self.read_text(':', true, false)?.into()),
            '=' => {
                let key = self.read_text('=', true, false)?;
                return self.parse_pair(key.into(), pos);
            }
            '|' => self.dynamic(true)?,
            '_' => return self.dereference(true, pos),
            '?' => {
                let text = self.read_token('?', true, pos)?;
                if !text.is_empty() {
                    return Err(Error::literal("null", &text).at(pos));
                }
                ElementKind::Null
            }
            '#' | '&' | '*' | '^' | '~' | '@' | '\\' => self.scalar(next, true, pos)?,
            other => {
                return Err(Error::from_code(
                    ErrorCode::UnexpectedCharacter,
                    format!("Unexpected character '{other}' after '<'"),
                )
                .at(pos));
            }
        };
        Ok(self.doc.create(kind))
    }

    // ---- containers ----

    fn parse_container(&mut self, kind: ElementKind, close: char, explicit: bool) -> Result<ElementId> {
        let start = self.scanner.position();
        let what = kind.name();
        if explicit {
            self.scanner.bump();
        }
        self.scanner.bump();
        let container = self.doc.create(kind);
        let mut pending = Pending::new();
        loop {
            self.scanner.skip_whitespace();
            let pos = self.scanner.position();
            match self.scanner.peek() {
                None => return Err(unexpected_end(what, start)),
                Some(c) if c == close => {
                    self.scanner.bump();
                    if explicit {
                        if self.scanner.peek() != Some('>') {
                            return Err(Error::from_code(
                                ErrorCode::UnbalancedDelimiter,
                                format!("Expected '>' after '{close}' of explicit {what}"),
                            )
                            .at(self.scanner.position()));
                        }
                        self.scanner.bump();
                    }
                    break;
                }
                Some(c @ (')' | ']' | '}')) => {
                    return Err(Error::from_code(
                        ErrorCode::UnbalancedDelimiter,
                        format!("Expected '{close}' to close {what} but found '{c}'"),
                    )
                    .at(pos));
                }
                Some(_) => {
                    let child = self.parse_element()?;
                    self.attach(container, child, &mut pending, pos)?;
                }
            }
        }
        self.flush_unbound(pending, Some(container))?;
        Ok(container)
    }

    fn attach(&mut self, parent: ElementId, child: ElementId, pending: &mut Pending, pos: Position) -> Result<()> {
        if self.is_dropped(child) {
            return Ok(());
        }
        self.doc.add(parent, child).map_err(|e| e.at(pos))?;
        match self.doc.kind(child) {
            ElementKind::ProcessingInstruction(_) => pending.push((child, pos)),
            ElementKind::Comment(_) => {}
            _ => {
                let bound = std::mem::take(pending);
                self.bind_instructions(bound, child)?;
            }
        }
        Ok(())
    }

    fn read_key(&mut self) -> CompactString {
        let mut key = String::new();
        while let Some(c) = self.scanner.peek().filter(|c| is_key_char(*c)) {
            key.push(c);
            self.scanner.bump();
        }
        CompactString::from(key)
    }

    /// Key followed by optional instructions and comments, then the value.
    fn parse_pair(&mut self, key: CompactString, pos: Position) -> Result<ElementId> {
        let key = CompactString::from(self.normalize(key.into_string()));
        let pair = self.doc.create(ElementKind::KeyValuePair { key: key.clone() });
        let mut pending = Pending::new();
        loop {
            self.scanner.skip_whitespace();
            let at = self.scanner.position();
            if self.scanner.starts_with("<!") {
                let pi = self.parse_instruction(at)?;
                self.doc.add(pair, pi).map_err(|e| e.at(at))?;
                pending.push((pi, at));
            } else if self.scanner.starts_with("</") {
                let comment = self.parse_element()?;
                self.doc.add(pair, comment).map_err(|e| e.at(at))?;
            } else {
                break;
            }
        }
        if self.scanner.peek().is_none_or(|c| matches!(c, ')' | ']' | '}' | '!' | '>')) {
            let code = if self.scanner.at_end() { ErrorCode::UnexpectedEnd } else { ErrorCode::UnexpectedCharacter };
            return Err(Error::from_code(code, format!("Key '{key}' has no value")).at(pos));
        }
        let at = self.scanner.position();
        let value = self.parse_element()?;
        if self.is_dropped(value) {
            return Ok(pair);
        }
        self.doc.add(pair, value).map_err(|e| e.at(at))?;
        self.bind_instructions(pending, value)?;
        Ok(pair)
    }

    // ---- text literals ----

    /// Read a text literal delimited by runs of `delim`. The cursor is at
    /// `<` (explicit) or at the first delimiter (compact).
    fn read_text(&mut self, delim: char, explicit: bool, interpolate: bool) -> Result<String> {
        let start = self.scanner.position();
        if explicit {
            self.scanner.bump();
        }
        let run = self.scanner.run_length(delim, 0);
        self.scanner.advance(run);
        if explicit {
            if run % 2 == 0 && self.scanner.peek() == Some('>') {
                self.scanner.bump();
                return Ok(String::new());
            }
        } else if run >= 2
            && run % 2 == 0
            && self.scanner.peek().is_none_or(|c| c.is_whitespace() || matches!(c, ')' | ']' | '}' | '!'))
        {
            return Ok(String::new());
        }

        let mut out = String::new();
        let mut chunk = String::new();
        loop {
            let closed = if explicit {
                self.scanner.at_explicit_close(delim, run)
            } else {
                self.scanner.run_length(delim, 0) >= run
            };
            if closed {
                self.scanner.advance(if explicit { run + 1 } else { run });
                break;
            }
            if interpolate
                && self.scanner.peek() == Some('<')
                && self.scanner.peek_at(1).is_some_and(is_embedded_sigil)
            {
                self.flush_interpolated(&mut out, &mut chunk);
                let embedded = self.embedded_text()?;
                out.push_str(&embedded);
                continue;
            }
            match self.scanner.bump() {
                Some(c) => chunk.push(c),
                None => return Err(unexpected_end(&format!("literal '{delim}'"), start)),
            }
        }
        if interpolate {
            self.flush_interpolated(&mut out, &mut chunk);
        } else {
            out = chunk;
        }
        if explicit && out.starts_with(' ') && needs_leading_pad(&out, delim) {
            out.remove(0);
        }
        Ok(self.normalize(out))
    }

    fn flush_interpolated(&self, out: &mut String, chunk: &mut String) {
        if chunk.is_empty() {
            return;
        }
        let replaced = substitute_tokens(chunk, |name| self.binding_text(name));
        out.push_str(&replaced);
        chunk.clear();
    }

    fn binding_text(&self, name: &str) -> Option<String> {
        self.resolver.lookup(name).map(|id| self.text_of(id))
    }

    /// Plain text of an element for interpolation.
    fn text_of(&self, id: ElementId) -> String {
        self.doc
            .kind(id)
            .scalar_text()
            .unwrap_or_else(|| self.doc.element_to_text(id, &SerializeOptions::compact()))
    }

    /// Evaluate an element embedded in interpolated text to its text.
    fn embedded_text(&mut self) -> Result<String> {
        if self.scanner.peek_at(1) == Some('_') {
            let start = self.scanner.position();
            self.scanner.advance(2);
            let mut name = String::new();
            while !self.scanner.starts_with("_>") {
                match self.scanner.bump() {
                    Some(c) => name.push(c),
                    None => return Err(unexpected_end("embedded dereference", start)),
                }
            }
            self.scanner.advance(2);
            let name = name.trim();
            return Ok(self.binding_text(name).unwrap_or_else(|| format!("<_{name}_>")));
        }
        let element = self.parse_element()?;
        Ok(self.text_of(element))
    }

    // ---- scalars ----

    /// Token text of a numeric, boolean, date, character or null literal.
    fn read_token(&mut self, sigil: char, explicit: bool, start: Position) -> Result<String> {
        if explicit {
            self.scanner.bump();
            let run = self.scanner.run_length(sigil, 0);
            self.scanner.advance(run);
            if run % 2 == 0 && self.scanner.peek() == Some('>') {
                self.scanner.bump();
                return Ok(String::new());
            }
            let mut text = String::new();
            loop {
                if self.scanner.at_explicit_close(sigil, run) {
                    self.scanner.advance(run + 1);
                    break;
                }
                if self.scanner.starts_with("<|") {
                    let value = self.embedded_dynamic()?;
                    text.push_str(&value);
                    continue;
                }
                match self.scanner.bump() {
                    Some(c) => text.push(c),
                    None => return Err(unexpected_end(&format!("literal '{sigil}'"), start)),
                }
            }
            return Ok(text.trim().to_string());
        }
        self.scanner.bump();
        if self.scanner.starts_with("<|") {
            let value = self.embedded_dynamic()?;
            if self.scanner.peek() == Some(sigil) {
                self.scanner.bump();
            }
            return Ok(value.trim().to_string());
        }
        let mut text = String::new();
        while !self.scanner.at_token_end() {
            if let Some(c) = self.scanner.bump() {
                text.push(c);
            }
        }
        if text.len() > 1 && text.ends_with(sigil) {
            text.pop();
        }
        Ok(text)
    }

    fn embedded_dynamic(&mut self) -> Result<String> {
        match self.dynamic(true)? {
            ElementKind::Dynamic { value, .. } => Ok(value.unwrap_or_default()),
            _ => Ok(String::new()),
        }
    }

    fn scalar(&mut self, sigil: char, explicit: bool, pos: Position) -> Result<ElementKind> {
        let text = self.read_token(sigil, explicit, pos)?;
        let kind = match sigil {
            '#' => ElementKind::Integer(literal::integer(&text).map_err(|e| e.at(pos))?),
            '&' => ElementKind::Long(literal::long(&text).map_err(|e| e.at(pos))?),
            '*' => ElementKind::Decimal(literal::decimal(&text).map_err(|e| e.at(pos))?),
            '^' => {
                let (value, lossy) = literal::double(&text).map_err(|e| e.at(pos))?;
                if lossy {
                    self.doc.push_warning(
                        Warning::new(
                            WarningKind::NumericPrecisionLoss,
                            format!("Double literal '{text}' has more digits than a double can hold"),
                            pos,
                        )
                        .with_context(text.as_str()),
                    );
                }
                ElementKind::Double(value)
            }
            '~' => ElementKind::Boolean(literal::boolean(&text).map_err(|e| e.at(pos))?),
            '@' => ElementKind::date_time(DateTimeValue::parse(&text).map_err(|e| e.at(pos))?),
            _ => ElementKind::Character(literal::character(&text, &self.characters).map_err(|e| e.at(pos))?),
        };
        Ok(kind)
    }

    /// Bare `42` or `-42`; values outside `i32` become longs.
    fn implicit_integer(&mut self, pos: Position) -> Result<ElementKind> {
        let mut text = String::new();
        while !self.scanner.at_token_end() {
            if let Some(c) = self.scanner.bump() {
                text.push(c);
            }
        }
        if !text.trim_start_matches(['-', '+']).bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::literal("integer", &text).at(pos));
        }
        let value = literal::long(&text).map_err(|_| Error::literal("integer", &text).at(pos))?;
        Ok(i32::try_from(value).map_or(ElementKind::Long(value), ElementKind::Integer))
    }

    fn dynamic(&mut self, explicit: bool) -> Result<ElementKind> {
        let name = self.read_text('|', explicit, false)?;
        let name = name.trim();
        let value = self.options.dynamic_sources().resolve(name, &self.sources);
        tracing::trace!(name, resolved = value.is_some(), "dynamic value");
        Ok(ElementKind::Dynamic { name: CompactString::from(name), value })
    }

    fn dereference(&mut self, explicit: bool, pos: Position) -> Result<ElementId> {
        let mut name = String::new();
        if explicit {
            self.scanner.advance(2);
            while !self.scanner.starts_with("_>") {
                match self.scanner.bump() {
                    Some(c) => name.push(c),
                    None => return Err(unexpected_end("dereference", pos)),
                }
            }
            self.scanner.advance(2);
            name = name.trim().to_string();
        } else {
            self.scanner.bump();
            while let Some(c) = self.scanner.peek().filter(|c| is_key_char(*c)) {
                name.push(c);
                self.scanner.bump();
            }
            if name.len() > 1 && name.ends_with('_') {
                name.pop();
            }
        }
        if name.is_empty() {
            return Err(Error::from_code(ErrorCode::UnexpectedCharacter, "Dereference without a name").at(pos));
        }
        let placeholder = self.doc.create(ElementKind::Reference(CompactString::from(name.as_str())));
        Ok(self.resolver.resolve_immediate(&mut self.doc, placeholder, &name, pos))
    }
}
