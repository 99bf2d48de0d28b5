use std::collections::HashMap;

use super::ScriptValue;

/// Variables visible to operators. Names are case-insensitive.
///
/// [`ScriptingContext::new`] pre-populates host variables (`PLATFORM`,
/// `ARCHITECTURE`, `PROCESSOR_COUNT`, `CPU_CORES`, `DEBUG`,
/// `WORKING_DIRECTORY`, `XFERLANG_VERSION`).
#[derive(Debug, Clone, Default)]
pub struct ScriptingContext {
    variables: HashMap<String, ScriptValue>,
}

impl ScriptingContext {
    pub fn new() -> Self {
        let mut ctx = Self::empty();
        ctx.register_builtin_variables();
        ctx
    }

    /// A context without host variables.
    pub fn empty() -> Self {
        Self::default()
    }

    fn register_builtin_variables(&mut self) {
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let cores = i64::try_from(cores).unwrap_or(i64::MAX);
        self.set_variable("PLATFORM", ScriptValue::Text(std::env::consts::OS.to_string()));
        self.set_variable("ARCHITECTURE", ScriptValue::Text(std::env::consts::ARCH.to_string()));
        self.set_variable("PROCESSOR_COUNT", ScriptValue::Int(cores));
        self.set_variable("CPU_CORES", ScriptValue::Int(cores));
        self.set_variable("DEBUG", ScriptValue::Bool(cfg!(debug_assertions)));
        if let Ok(dir) = std::env::current_dir() {
            self.set_variable("WORKING_DIRECTORY", ScriptValue::Text(dir.display().to_string()));
        }
        self.set_variable("XFERLANG_VERSION", ScriptValue::Text(env!("CARGO_PKG_VERSION").to_string()));
    }

    pub fn set_variable(&mut self, name: &str, value: ScriptValue) {
        self.variables.insert(name.to_lowercase(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&ScriptValue> {
        self.variables.get(&name.to_lowercase())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(&name.to_lowercase())
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<ScriptValue> {
        self.variables.remove(&name.to_lowercase())
    }

    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut ctx = ScriptingContext::empty();
        ctx.set_variable("Region", ScriptValue::Text("eu".into()));
        assert_eq!(ctx.variable("REGION"), Some(&ScriptValue::Text("eu".into())));
        assert!(ctx.remove_variable("region").is_some());
        assert!(!ctx.has_variable("Region"));
    }

    #[test]
    fn host_variables_are_present() {
        let ctx = ScriptingContext::new();
        assert_eq!(ctx.variable("platform"), Some(&ScriptValue::Text(std::env::consts::OS.into())));
        assert!(matches!(ctx.variable("CPU_CORES"), Some(ScriptValue::Int(n)) if *n >= 1));
    }
}
