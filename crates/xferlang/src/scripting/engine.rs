use std::collections::HashSet;
use std::sync::Arc;

use compact_str::CompactString;

use super::registry::OperatorTable;
use super::{
    Operator, OperatorCategory, OperatorRegistry, ScriptError, ScriptValue, ScriptingContext, arity_text,
};
use crate::document::ElementRef;
use crate::element::ElementKind;

/// Evaluates operators against elements.
///
/// The operator table is a snapshot taken at construction; local
/// registrations never touch the registry it came from.
pub struct ScriptingEngine {
    context: ScriptingContext,
    operators: OperatorTable,
    baseline: HashSet<CompactString>,
}

impl ScriptingEngine {
    /// Engine over a snapshot of the process-wide registry.
    pub fn new(context: ScriptingContext) -> Self {
        Self::with_registry(context, OperatorRegistry::global())
    }

    pub fn with_registry(context: ScriptingContext, registry: &OperatorRegistry) -> Self {
        let operators = registry.snapshot();
        let baseline = operators.keys().cloned().collect();
        Self { context, operators, baseline }
    }

    pub const fn context(&self) -> &ScriptingContext {
        &self.context
    }

    pub const fn context_mut(&mut self) -> &mut ScriptingContext {
        &mut self.context
    }

    /// Add an operator to this engine only. A name that is already present
    /// is rejected.
    pub fn register_operator(&mut self, operator: Arc<dyn Operator>) -> Result<(), ScriptError> {
        let name = CompactString::from(operator.name().to_lowercase());
        if self.operators.contains_key(&name) {
            return Err(ScriptError::AlreadyRegistered(name.to_string()));
        }
        self.operators.insert(name, operator);
        Ok(())
    }

    pub fn unregister_operator(&mut self, name: &str) -> bool {
        self.operators.remove(name.to_lowercase().as_str()).is_some()
    }

    /// Drop operators registered on this engine after construction.
    pub fn clear_custom_operators(&mut self) {
        self.operators.retain(|name, _| self.baseline.contains(name));
    }

    pub fn has_operator(&self, name: &str) -> bool {
        self.operators.contains_key(name.to_lowercase().as_str())
    }

    pub fn operator(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.get(name.to_lowercase().as_str())
    }

    pub fn operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(CompactString::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn operators_by_category(&self, category: OperatorCategory) -> Vec<&Arc<dyn Operator>> {
        let mut ops: Vec<_> = self.operators.values().filter(|op| op.category() == category).collect();
        ops.sort_by(|a, b| a.name().cmp(b.name()));
        ops
    }

    /// Apply the named operator after checking its arity.
    pub fn evaluate(&self, name: &str, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        let op = self.operator(name).ok_or_else(|| ScriptError::UnknownOperator(name.to_string()))?;
        let (min, max) = (op.min_arguments(), op.max_arguments());
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(ScriptError::WrongArity {
                name: op.name().to_string(),
                expected: arity_text(min, max),
                actual: args.len(),
            });
        }
        tracing::trace!(operator = name, args = args.len(), "evaluating operator");
        op.evaluate(self, args)
    }

    pub fn try_evaluate(&self, name: &str, args: &[ElementRef<'_>]) -> Option<ScriptValue> {
        self.evaluate(name, args).ok()
    }

    /// Name of the operator an expression element applies, if it is one:
    /// a pair `op[args]` or a collection `[op args...]` headed by a known
    /// operator name.
    pub fn expression_operator<'a>(&self, element: ElementRef<'a>) -> Option<&'a str> {
        match element.kind() {
            ElementKind::KeyValuePair { key } if self.has_operator(key) => Some(key.as_str()),
            ElementKind::Array { .. } | ElementKind::Tuple => {
                let head = element.semantic_children().next()?;
                match head.kind() {
                    ElementKind::Identifier(name) | ElementKind::Keyword(name) if self.has_operator(name) => {
                        Some(name.as_str())
                    }
                    ElementKind::String(name) if self.has_operator(name) => Some(name.as_str()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Evaluate `op[args]`, `op(args)`, `op value` or `[op args...]`.
    ///
    /// Anything else resolves to its plain value.
    pub fn evaluate_expression(&self, element: ElementRef<'_>) -> Result<ScriptValue, ScriptError> {
        match element.kind() {
            ElementKind::KeyValuePair { key } => {
                if !self.has_operator(key) {
                    return Err(ScriptError::UnknownOperator(key.to_string()));
                }
                let value = element.value().ok_or_else(|| ScriptError::MissingArguments(key.to_string()))?;
                let args: Vec<ElementRef<'_>> = match value.kind() {
                    ElementKind::Array { .. } | ElementKind::Tuple => value.semantic_children().collect(),
                    _ => vec![value],
                };
                self.evaluate(key, &args)
            }
            ElementKind::Array { .. } | ElementKind::Tuple => match self.expression_operator(element) {
                Some(name) => {
                    let args: Vec<ElementRef<'_>> = element.semantic_children().skip(1).collect();
                    self.evaluate(name, &args)
                }
                None => Ok(self.resolve_value(element)),
            },
            _ => Ok(self.resolve_value(element)),
        }
    }

    /// Value of an element as an operator operand. Nested operator
    /// applications are evaluated; failures resolve to null.
    pub fn resolve_value(&self, element: ElementRef<'_>) -> ScriptValue {
        match element.kind() {
            ElementKind::String(s) | ElementKind::Interpolated(s) | ElementKind::Comment(s) => {
                ScriptValue::Text(s.clone())
            }
            ElementKind::Identifier(s) | ElementKind::Keyword(s) => ScriptValue::Text(s.to_string()),
            ElementKind::Character(c) => ScriptValue::Text(c.to_string()),
            ElementKind::Dynamic { name, value } => match self.context.variable(name) {
                Some(v) => v.clone(),
                None => value.clone().map_or(ScriptValue::Null, ScriptValue::Text),
            },
            ElementKind::Reference(_) | ElementKind::Null | ElementKind::Empty => ScriptValue::Null,
            ElementKind::Integer(v) => ScriptValue::Int(i64::from(*v)),
            ElementKind::Long(v) => ScriptValue::Int(*v),
            ElementKind::Decimal(v) => ScriptValue::Decimal(*v),
            ElementKind::Double(v) => ScriptValue::Double(*v),
            ElementKind::Boolean(v) => ScriptValue::Bool(*v),
            ElementKind::DateTime { value, .. } => ScriptValue::DateTime(*value),
            ElementKind::Array { .. } | ElementKind::Tuple | ElementKind::Object => {
                ScriptValue::Collection(element.semantic_children().count())
            }
            ElementKind::KeyValuePair { key } => {
                if self.has_operator(key) {
                    self.evaluate_expression(element).unwrap_or(ScriptValue::Null)
                } else {
                    element.value().map_or(ScriptValue::Null, |v| self.resolve_value(v))
                }
            }
            ElementKind::ProcessingInstruction(_) => ScriptValue::Null,
        }
    }

    /// Whether an element is meaningfully present. Dynamic values count
    /// only when their source or a context variable provides one.
    pub fn is_defined(&self, element: ElementRef<'_>) -> bool {
        match element.kind() {
            ElementKind::Dynamic { name, value } => value.is_some() || self.context.has_variable(name),
            ElementKind::Reference(_) | ElementKind::Null | ElementKind::Empty => false,
            ElementKind::KeyValuePair { key } if !self.has_operator(key) => {
                element.value().is_some_and(|v| self.is_defined(v))
            }
            _ => !self.resolve_value(element).is_null(),
        }
    }

    /// Truthiness of an element; dynamic values are true when defined.
    pub fn is_truthy(&self, element: ElementRef<'_>) -> bool {
        match element.kind() {
            ElementKind::Dynamic { .. } => self.is_defined(element),
            _ => self.resolve_value(element).is_truthy(),
        }
    }
}
