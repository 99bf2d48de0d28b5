use std::sync::Arc;

use crate::document::ElementRef;
use crate::register_operator;
use crate::scripting::{Operator, OperatorCategory, ScriptError, ScriptValue, ScriptingEngine};

struct And;
struct Or;
struct Not;
struct Xor;
struct If;

impl Operator for And {
    fn name(&self) -> &str {
        "and"
    }

    fn description(&self) -> &str {
        "True when every operand is truthy; stops at the first falsy one"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Logical
    }

    fn min_arguments(&self) -> usize {
        2
    }

    fn max_arguments(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        Ok(ScriptValue::Bool(args.iter().all(|a| engine.is_truthy(*a))))
    }
}

impl Operator for Or {
    fn name(&self) -> &str {
        "or"
    }

    fn description(&self) -> &str {
        "True when any operand is truthy; stops at the first truthy one"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Logical
    }

    fn min_arguments(&self) -> usize {
        2
    }

    fn max_arguments(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        Ok(ScriptValue::Bool(args.iter().any(|a| engine.is_truthy(*a))))
    }
}

impl Operator for Not {
    fn name(&self) -> &str {
        "not"
    }

    fn description(&self) -> &str {
        "Negates the truthiness of its operand"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Logical
    }

    fn min_arguments(&self) -> usize {
        1
    }

    fn max_arguments(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        Ok(ScriptValue::Bool(!engine.is_truthy(args[0])))
    }
}

impl Operator for Xor {
    fn name(&self) -> &str {
        "xor"
    }

    fn description(&self) -> &str {
        "True when exactly one of two operands is truthy"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Logical
    }

    fn min_arguments(&self) -> usize {
        2
    }

    fn max_arguments(&self) -> Option<usize> {
        Some(2)
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        Ok(ScriptValue::Bool(engine.is_truthy(args[0]) != engine.is_truthy(args[1])))
    }
}

impl Operator for If {
    fn name(&self) -> &str {
        "if"
    }

    fn description(&self) -> &str {
        "Returns the second operand when the first is truthy, else the third (or null)"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Logical
    }

    fn min_arguments(&self) -> usize {
        2
    }

    fn max_arguments(&self) -> Option<usize> {
        Some(3)
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        let chosen = if engine.is_truthy(args[0]) { args.get(1) } else { args.get(2) };
        Ok(chosen.map_or(ScriptValue::Null, |el| engine.resolve_value(*el)))
    }
}

fn and() -> Arc<dyn Operator> {
    Arc::new(And)
}

fn or() -> Arc<dyn Operator> {
    Arc::new(Or)
}

fn not() -> Arc<dyn Operator> {
    Arc::new(Not)
}

fn xor() -> Arc<dyn Operator> {
    Arc::new(Xor)
}

fn if_else() -> Arc<dyn Operator> {
    Arc::new(If)
}

register_operator!(and);
register_operator!(or);
register_operator!(not);
register_operator!(xor);
register_operator!(if_else);
