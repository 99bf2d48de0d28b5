use std::sync::Arc;

use crate::document::ElementRef;
use crate::register_operator;
use crate::scripting::{Operator, OperatorCategory, ScriptError, ScriptValue, ScriptingEngine};

struct Defined;

impl Operator for Defined {
    fn name(&self) -> &str {
        "defined"
    }

    fn description(&self) -> &str {
        "True when the operand has a value; dynamic values must resolve"
    }

    fn category(&self) -> OperatorCategory {
        OperatorCategory::Utility
    }

    fn min_arguments(&self) -> usize {
        1
    }

    fn max_arguments(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(&self, engine: &ScriptingEngine, args: &[ElementRef<'_>]) -> Result<ScriptValue, ScriptError> {
        Ok(ScriptValue::Bool(engine.is_defined(args[0])))
    }
}

fn defined() -> Arc<dyn Operator> {
    Arc::new(Defined)
}

register_operator!(defined);
