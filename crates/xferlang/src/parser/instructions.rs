//! Reading processing instructions and applying their behavior.

use compact_str::CompactString;

use super::session::{Pending, Session};
use crate::element::{ElementId, ElementKind};
use crate::error::{Error, ErrorCode, Position, Result};
use crate::pi::{ConditionOutcome, Instruction, InstructionKind};
use crate::resolver;
use crate::warning::{Warning, WarningKind};

fn invalid_instruction(message: impl Into<String>) -> Error {
    Error::from_code(ErrorCode::InvalidInstruction, message)
}

impl Session<'_> {
    /// `<! name payload !>` at the cursor. Parse-time effects (`let`, `if`,
    /// `dynamicSource`, `chardef`, `defined`) happen here; target effects
    /// wait for [`Session::bind_instructions`].
    pub(super) fn parse_instruction(&mut self, pos: Position) -> Result<ElementId> {
        self.scanner.bump();
        let run = self.scanner.run_length('!', 0);
        self.scanner.advance(run);
        self.scanner.skip_whitespace();
        if self.scanner.at_explicit_close('!', run) {
            return Err(invalid_instruction("Processing instruction without a name").at(pos));
        }
        let payload = self.parse_element()?;
        let (name, value) = match (self.doc.kind(payload), self.doc.kvp_value(payload)) {
            (ElementKind::KeyValuePair { key }, Some(value)) => (key.clone(), value),
            (other, _) => {
                return Err(invalid_instruction(format!(
                    "Processing instruction must start with a name, found a {}",
                    other.name()
                ))
                .at(pos));
            }
        };
        self.scanner.skip_whitespace();
        if !self.scanner.at_explicit_close('!', run) {
            let code = if self.scanner.at_end() { ErrorCode::UnexpectedEnd } else { ErrorCode::UnexpectedCharacter };
            return Err(Error::from_code(code, format!("Expected '!>' to close instruction '{name}'"))
                .at(self.scanner.position()));
        }
        self.scanner.advance(run + 1);

        let kind = match self.options.instructions().create(&self.doc, &name, value) {
            Some(created) => created.map_err(|e| e.at(pos))?,
            None => {
                self.doc.push_warning(
                    Warning::new(
                        WarningKind::UnregisteredProcessingInstruction,
                        format!("Processing instruction '{name}' is not registered"),
                        pos,
                    )
                    .with_context(name.as_str()),
                );
                InstructionKind::Unregistered
            }
        };
        let pi = self.doc.create(ElementKind::ProcessingInstruction(Instruction::new(name.clone(), kind)));
        self.doc.add(pi, payload).map_err(|e| e.at(pos))?;
        self.doc.record_instruction(pi);
        tracing::debug!(name = %name, "processing instruction");
        self.on_parsed(pi, value, pos).map_err(|e| e.at(pos))?;
        Ok(pi)
    }

    fn kind_of(&self, pi: ElementId) -> Option<InstructionKind> {
        self.doc.instruction(pi).map(|i| i.kind.clone())
    }

    fn update(&mut self, pi: ElementId, kind: InstructionKind, suppress: bool) {
        if let Some(instr) = self.doc.instruction_mut(pi) {
            instr.kind = kind;
            instr.suppress_serialization = suppress;
        }
    }

    fn on_parsed(&mut self, pi: ElementId, value: ElementId, pos: Position) -> Result<()> {
        match self.kind_of(pi) {
            Some(InstructionKind::Let { .. }) => {
                let (name, bound) = self.let_binding(value)?;
                self.bind(&name, bound)?;
                self.update(pi, InstructionKind::Let { name: Some(name) }, true);
            }
            Some(InstructionKind::If { .. }) => {
                let outcome = self.condition_outcome(value);
                tracing::debug!(?outcome, "conditional evaluated");
                let suppress = !matches!(outcome, ConditionOutcome::UnknownOperator(_));
                if let ConditionOutcome::UnknownOperator(op) = &outcome {
                    self.doc.push_warning(
                        Warning::new(
                            WarningKind::UnknownConditionalOperator,
                            format!("Unknown conditional operator '{op}'"),
                            pos,
                        )
                        .with_context(op.as_str()),
                    );
                }
                self.update(pi, InstructionKind::If { outcome: Some(outcome) }, suppress);
            }
            Some(InstructionKind::Defined { .. }) => {
                let defined = self.engine.is_defined(self.doc.element(value));
                self.update(pi, InstructionKind::Defined { defined: Some(defined) }, false);
            }
            Some(InstructionKind::DynamicSource) => self.sources.extend_from_object(&self.doc, value)?,
            Some(InstructionKind::CharDef) => self.define_characters(value)?,
            _ => {}
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, value: ElementId) -> Result<()> {
        if resolver::refers_to(&self.doc, value, name) {
            return Err(Error::from_code(
                ErrorCode::SelfReference,
                format!("Binding '{name}' refers to itself"),
            ));
        }
        self.resolver.bind(name, value);
        Ok(())
    }

    /// `name value`, `( name value )` or a pair `name value` inside a list.
    fn let_binding(&self, value: ElementId) -> Result<(CompactString, ElementId)> {
        match self.doc.kind(value) {
            ElementKind::KeyValuePair { key } => match self.doc.kvp_value(value) {
                Some(bound) => Ok((key.clone(), bound)),
                None => Err(invalid_instruction(format!("Binding '{key}' has no value"))),
            },
            ElementKind::Tuple | ElementKind::Array { .. } => {
                let items: Vec<ElementId> = self.doc.semantic_children(value).collect();
                match items.as_slice() {
                    [single] if matches!(self.doc.kind(*single), ElementKind::KeyValuePair { .. }) => {
                        self.let_binding(*single)
                    }
                    [name, bound] if self.doc.kind(*name).is_text() => {
                        let name = self.doc.kind(*name).scalar_text().unwrap_or_default();
                        Ok((CompactString::from(name), *bound))
                    }
                    _ => Err(invalid_instruction("Instruction 'let' expects a name and a value")),
                }
            }
            other => Err(invalid_instruction(format!(
                "Instruction 'let' expects a name and a value, found a {}",
                other.name()
            ))),
        }
    }

    fn condition_outcome(&self, condition: ElementId) -> ConditionOutcome {
        let element = self.doc.element(condition);
        let expression = match element.kind() {
            ElementKind::KeyValuePair { key } => {
                if !self.engine.has_operator(key) {
                    return ConditionOutcome::UnknownOperator(key.clone());
                }
                true
            }
            ElementKind::Array { .. } | ElementKind::Tuple => self.engine.expression_operator(element).is_some(),
            _ => false,
        };
        let met = if expression {
            match self.engine.evaluate_expression(element) {
                Ok(value) => value.is_truthy(),
                Err(err) => {
                    tracing::debug!(error = %err, "condition failed to evaluate");
                    false
                }
            }
        } else {
            self.engine.is_truthy(element)
        };
        if met { ConditionOutcome::Met } else { ConditionOutcome::NotMet }
    }

    fn define_characters(&mut self, object: ElementId) -> Result<()> {
        let pairs: Vec<ElementId> = self.doc.values(object).collect();
        for kvp in pairs {
            let (Some(name), Some(value)) = (self.doc.pair_key(kvp), self.doc.kvp_value(kvp)) else {
                continue;
            };
            let ch = match self.doc.kind(value) {
                ElementKind::Character(c) => Some(*c),
                other => other.scalar_text().and_then(|s| {
                    let mut chars = s.chars();
                    chars.next().filter(|_| chars.next().is_none())
                }),
            };
            let Some(ch) = ch else {
                return Err(invalid_instruction(format!("Character definition '{name}' needs a single character")));
            };
            tracing::debug!(name, ch = %ch.escape_unicode(), "defined character");
            self.characters.define(name, ch);
        }
        Ok(())
    }

    /// Apply instructions to the sibling that follows them.
    pub(super) fn bind_instructions(&mut self, pending: Pending, target: ElementId) -> Result<()> {
        let mut removed = false;
        for (pi, pos) in pending {
            if let Some(instr) = self.doc.instruction_mut(pi) {
                instr.target = Some(target);
            }
            let value = self.doc.instruction_value(pi);
            match self.kind_of(pi) {
                Some(InstructionKind::Id) if !removed => {
                    let id = value.and_then(|v| self.doc.kind(v).scalar_text()).unwrap_or_default();
                    self.doc.set_id(target, &id).map_err(|e| e.at(pos))?;
                }
                Some(InstructionKind::Tag) if !removed => {
                    let tag = value.and_then(|v| self.doc.kind(v).scalar_text()).unwrap_or_default();
                    self.doc.set_tag(target, &tag).map_err(|e| e.at(pos))?;
                }
                Some(InstructionKind::If { outcome: Some(ConditionOutcome::NotMet) }) if !removed => {
                    self.remove_conditional(target);
                    removed = true;
                }
                Some(InstructionKind::Script { .. }) => {
                    self.execute_script(pi, (!removed).then_some(target)).map_err(|e| e.at(pos))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Drop an element whose condition failed. A pair's value takes the
    /// pair with it.
    fn remove_conditional(&mut self, target: ElementId) {
        tracing::debug!(element = target.index(), kind = self.doc.kind(target).name(), "condition not met, removing");
        match self.doc.parent(target) {
            Some(pair) if matches!(self.doc.kind(pair), ElementKind::KeyValuePair { .. }) && self.doc.parent(pair).is_some() => {
                self.doc.remove(pair);
            }
            _ => {
                self.doc.remove(target);
            }
        }
    }

    /// Instructions left without a following sibling when a container (or
    /// the document) ends. Scripts still run, resolving inside `scope`.
    pub(super) fn flush_unbound(&mut self, pending: Pending, scope: Option<ElementId>) -> Result<()> {
        for (pi, pos) in pending {
            if matches!(self.kind_of(pi), Some(InstructionKind::Script { .. })) {
                self.execute_script(pi, scope).map_err(|e| e.at(pos))?;
            }
        }
        Ok(())
    }

    /// Run a script's operations in order, then retry pending dereferences
    /// inside `target`.
    fn execute_script(&mut self, pi: ElementId, target: Option<ElementId>) -> Result<()> {
        let Some(value) = self.doc.instruction_value(pi) else {
            return Ok(());
        };
        let operations: Vec<ElementId> = match self.doc.kind(value) {
            ElementKind::KeyValuePair { .. } => vec![value],
            _ => self.doc.semantic_children(value).collect(),
        };
        let mut only_bindings = true;
        for op in operations {
            let binding = match self.doc.kind(op) {
                ElementKind::KeyValuePair { key } if key.eq_ignore_ascii_case("let") => self.doc.kvp_value(op),
                _ => None,
            };
            if let Some(binding) = binding {
                let (_, bound) = self.let_binding(binding)?;
                self.resolver.resolve_local(&mut self.doc, bound)?;
                // the local pass may have replaced the bound element
                let (name, bound) = self.let_binding(binding)?;
                self.bind(&name, bound)?;
                continue;
            }
            only_bindings = false;
            match self.engine.evaluate_expression(self.doc.element(op)) {
                Ok(result) => tracing::trace!(%result, "script operation evaluated"),
                Err(err) => tracing::debug!(error = %err, "script operation failed"),
            }
        }
        self.update(pi, InstructionKind::Script { executed: true }, only_bindings);
        if let Some(target) = target {
            let resolved = self.resolver.resolve_local(&mut self.doc, target)?;
            tracing::debug!(resolved, "script local pass");
        }
        Ok(())
    }
}
