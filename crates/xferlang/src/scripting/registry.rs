use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use compact_str::CompactString;

use super::{Operator, OperatorCategory, registered_operators};

pub(crate) type OperatorTable = HashMap<CompactString, Arc<dyn Operator>>;

static GLOBAL: LazyLock<OperatorRegistry> = LazyLock::new(OperatorRegistry::new);

#[derive(Default)]
struct RegistryState {
    operators: OperatorTable,
    seeded: bool,
}

/// Thread-safe, case-insensitive table of operators.
///
/// A registry created with [`OperatorRegistry::new`] seeds the link-time
/// registered built-ins whenever it is queried while unseeded, so a
/// [`clear`](Self::clear) is followed by a fresh seed on the next query.
/// [`OperatorRegistry::empty`] is the way to get a registry without them.
pub struct OperatorRegistry {
    state: RwLock<RegistryState>,
}

/// Snapshot of a registry's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDiagnostics {
    pub total: usize,
    pub by_category: BTreeMap<OperatorCategory, usize>,
    pub names: Vec<String>,
}

fn key(name: &str) -> CompactString {
    CompactString::from(name.to_lowercase())
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self { state: RwLock::new(RegistryState::default()) }
    }

    /// A registry that never seeds built-ins.
    pub fn empty() -> Self {
        Self { state: RwLock::new(RegistryState { operators: HashMap::new(), seeded: true }) }
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    fn ensure_seeded(&self) {
        if self.state.read().unwrap_or_else(PoisonError::into_inner).seeded {
            return;
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.seeded {
            seed(&mut state.operators);
            state.seeded = true;
        }
    }

    /// Register an operator, replacing and returning any operator of the
    /// same name.
    pub fn register(&self, operator: Arc<dyn Operator>) -> Option<Arc<dyn Operator>> {
        self.ensure_seeded();
        let name = key(operator.name());
        tracing::debug!(operator = %name, "registering operator");
        self.state.write().unwrap_or_else(PoisonError::into_inner).operators.insert(name, operator)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.ensure_seeded();
        self.state.write().unwrap_or_else(PoisonError::into_inner).operators.remove(&key(name)).is_some()
    }

    /// Remove every operator, built-ins included. The built-ins come back
    /// on the next query.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.operators.clear();
        state.seeded = false;
    }

    /// Drop custom operators and restore the built-ins.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.operators.clear();
        seed(&mut state.operators);
        state.seeded = true;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ensure_seeded();
        self.state.read().unwrap_or_else(PoisonError::into_inner).operators.contains_key(&key(name))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operator>> {
        self.ensure_seeded();
        self.state.read().unwrap_or_else(PoisonError::into_inner).operators.get(&key(name)).cloned()
    }

    /// Lower-cased operator names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.ensure_seeded();
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = state.operators.keys().map(ToString::to_string).collect();
        names.sort_unstable();
        names
    }

    pub fn by_category(&self, category: OperatorCategory) -> Vec<Arc<dyn Operator>> {
        self.ensure_seeded();
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut ops: Vec<Arc<dyn Operator>> =
            state.operators.values().filter(|op| op.category() == category).cloned().collect();
        ops.sort_by(|a, b| a.name().cmp(b.name()));
        ops
    }

    pub fn diagnostics(&self) -> RegistryDiagnostics {
        self.ensure_seeded();
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut by_category = BTreeMap::new();
        for op in state.operators.values() {
            *by_category.entry(op.category()).or_insert(0) += 1;
        }
        let mut names: Vec<String> = state.operators.keys().map(ToString::to_string).collect();
        names.sort_unstable();
        RegistryDiagnostics { total: state.operators.len(), by_category, names }
    }

    pub(crate) fn snapshot(&self) -> OperatorTable {
        self.ensure_seeded();
        self.state.read().unwrap_or_else(PoisonError::into_inner).operators.clone()
    }
}

fn seed(operators: &mut OperatorTable) {
    for op in registered_operators() {
        operators.entry(key(op.name())).or_insert(op);
    }
    tracing::debug!(count = operators.len(), "seeded built-in operators");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_builtins_lazily() {
        let registry = OperatorRegistry::new();
        for name in ["eq", "ne", "lt", "lte", "gt", "gte", "and", "or", "not", "xor", "if", "defined"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.contains("EQ"));
    }

    #[test]
    fn clear_and_reset() {
        let registry = OperatorRegistry::new();
        registry.unregister("gt");
        assert!(!registry.contains("gt"));
        registry.clear();
        assert!(registry.contains("gt"));
        assert_eq!(registry.names().len(), 12);
        registry.unregister("lt");
        registry.reset();
        assert_eq!(registry.diagnostics().by_category.get(&OperatorCategory::Comparison), Some(&6));
    }

    #[test]
    fn empty_registry_stays_empty() {
        let registry = OperatorRegistry::empty();
        assert!(!registry.contains("eq"));
        assert_eq!(registry.diagnostics().total, 0);
    }

    #[test]
    fn concurrent_first_queries_seed_once() {
        let registry = Arc::new(OperatorRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.names().len())
            })
            .collect();
        let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(counts.iter().all(|c| *c == counts[0]));
        assert_eq!(counts[0], 12);
    }
}
