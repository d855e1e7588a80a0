use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Registry of atomic proposition names shared by every automaton of one
/// ingestion call.
///
/// Each distinct name gets a stable variable number the first time it is
/// registered, so automata read from different sources agree on which
/// variable stands for `"a"`. Cloning is cheap and yields a handle on the
/// same registry.
#[derive(Debug, Clone, Default)]
pub struct ApDictionary {
    inner: Arc<RwLock<Registry>>,
}

#[derive(Debug, Default)]
struct Registry {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ApDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable for `name`, allocating one if needed.
    pub fn register(&self, name: &str) -> usize {
        if let Some(var) = self.lookup(name) {
            return var;
        }
        let mut registry = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(var) = registry.index.get(name) {
            return *var;
        }
        let var = registry.names.len();
        registry.names.push(name.to_string());
        registry.index.insert(name.to_string(), var);
        var
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.index.get(name).copied()
    }

    pub fn name(&self, var: usize) -> Option<String> {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.names.get(var).cloned()
    }

    pub fn len(&self) -> usize {
        let registry = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        registry.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point at the same registry.
    pub fn same_as(&self, other: &ApDictionary) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
