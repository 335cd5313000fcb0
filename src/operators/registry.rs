//! Operator registry
//!
//! Populated once, then shared read-only. Optimization only ever borrows the
//! registry immutably, so descriptors cannot change mid-run.

use super::catalog::standard_operators;
use super::descriptor::OperatorDescriptor;
use crate::error::{FuseError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Catalog of operator descriptors keyed by name
#[derive(Clone, Debug, Default)]
pub struct OperatorRegistry {
    operators: IndexMap<String, OperatorDescriptor>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        OperatorRegistry {
            operators: IndexMap::new(),
        }
    }

    /// Registry holding the standard catalog
    pub fn standard() -> Result<Self> {
        Self::from_descriptors(standard_operators())
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = OperatorDescriptor>) -> Result<Self> {
        let mut registry = OperatorRegistry::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Add a descriptor. Names are globally unique.
    pub fn register(&mut self, descriptor: OperatorDescriptor) -> Result<()> {
        if self.operators.contains_key(&descriptor.name) {
            return Err(FuseError::DuplicateOperator(descriptor.name));
        }
        tracing::trace!(operator = %descriptor.name, "registered operator");
        self.operators.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Look up a descriptor. Unknown names are not an error.
    pub fn lookup(&self, name: &str) -> Option<&OperatorDescriptor> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &OperatorDescriptor> {
        self.operators.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

static STANDARD: Lazy<OperatorRegistry> = Lazy::new(|| {
    OperatorRegistry::standard().expect("standard operator catalog has unique names")
});

/// Process-wide standard registry, initialized on first use
pub fn standard_registry() -> &'static OperatorRegistry {
    &STANDARD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{Category, Multiplicity};

    #[test]
    fn test_lookup_known_and_unknown() {
        let registry = standard_registry();
        let map = registry.lookup("map").unwrap();
        assert_eq!(map.category, Category::Stateless);
        assert_eq!(map.multiplicity, Multiplicity::Preserve);

        assert!(registry.lookup("debounce").is_none());
        assert!(!registry.contains("map+map"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = OperatorRegistry::new();
        registry
            .register(OperatorDescriptor::stateless("map", Multiplicity::Preserve))
            .unwrap();
        let err = registry
            .register(OperatorDescriptor::stateless("map", Multiplicity::Conditional))
            .unwrap_err();
        assert_eq!(err, FuseError::DuplicateOperator("map".to_string()));
        assert_eq!(registry.lookup("map").unwrap().multiplicity, Multiplicity::Preserve);
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = OperatorRegistry::standard().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(&names[..3], &["map", "filter", "flatMap"]);
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_standard_registry_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| standard_registry() as *const OperatorRegistry as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    }
}
