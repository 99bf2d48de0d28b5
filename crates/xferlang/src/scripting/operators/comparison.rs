use std::cmp::Ordering;
use std::sync::Arc;

use crate::document::ElementRef;
use crate::register_operator;
use crate::scripting::value::{compare, values_equal};
use crate::scripting::{Operator, OperatorCategory, ScriptError, ScriptValue, ScriptingEngine};

type Predicate = fn(&ScriptValue, &ScriptValue) -> bool;

/// Binary comparison over resolved operand values.
struct Comparison {
    name: &'static str,
    description: &'static str,
    predicate: Predicate,
}

impl Operator for Comparison {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Comparison
    }

    fn min_arguments(&self) -> usize {
        2
    }

    fn max_arguments(&self) -> Option<usize> {
        Some(2)
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        let left = engine.resolve_value(args[0]);
        let right = engine.resolve_value(args[1]);
        Ok(ScriptValue::Bool((self.predicate)(&left, &right)))
    }
}

fn both_null(a: &ScriptValue, b: &ScriptValue) -> bool {
    a.is_null() && b.is_null()
}

fn ordered(a: &ScriptValue, b: &ScriptValue, accept: &[Ordering]) -> bool {
    !a.is_null() && !b.is_null() && compare(a, b).is_some_and(|o| accept.contains(&o))
}

fn eq() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "eq",
        description: "True when both operands are equal",
        predicate: values_equal,
    })
}

fn ne() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "ne",
        description: "True when the operands differ",
        predicate: |a, b| !values_equal(a, b),
    })
}

fn lt() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "lt",
        description: "True when the first operand is less than the second",
        predicate: |a, b| ordered(a, b, &[Ordering::Less]),
    })
}

fn lte() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "lte",
        description: "True when the first operand is less than or equal to the second",
        predicate: |a, b| both_null(a, b) || ordered(a, b, &[Ordering::Less, Ordering::Equal]),
    })
}

fn gt() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "gt",
        description: "True when the first operand is greater than the second",
        predicate: |a, b| ordered(a, b, &[Ordering::Greater]),
    })
}

fn gte() -> Arc<dyn Operator> {
    Arc::new(Comparison {
        name: "gte",
        description: "True when the first operand is greater than or equal to the second",
        predicate: |a, b| both_null(a, b) || ordered(a, b, &[Ordering::Greater, Ordering::Equal]),
    })
}

register_operator!(eq);
register_operator!(ne);
register_operator!(lt);
register_operator!(lte);
register_operator!(gt);
register_operator!(gte);
