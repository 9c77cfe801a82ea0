//! Capability to concrete type mappings.

use std::sync::Arc;

use ahash::AHashMap;

/// Maps each abstract (capability) type to the concrete object type that is built whenever
/// the capability is requested.
///
/// Mappings are independent: a concrete type returned here may itself declare members of
/// other capabilities, and those are resolved through their own entries when reached.
#[derive(Clone, Debug, Default)]
pub struct TypeMappingRegistry {
    mappings: AHashMap<Arc<str>, Arc<str>>,
}

impl TypeMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `concrete` for `capability`. A later registration for the same capability
    /// replaces the earlier one.
    pub fn register(&mut self, capability: &str, concrete: &str) {
        if let Some(previous) = self.mappings.insert(capability.into(), concrete.into()) {
            tracing::trace!(capability, %previous, concrete, "type mapping replaced");
        }
    }

    pub fn resolve(&self, capability: &str) -> Option<&str> {
        self.mappings.get(capability).map(|c| &**c)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_registration_wins() {
        let mut registry = TypeMappingRegistry::new();
        registry.register("ICar", "Car");
        registry.register("ICar", "Truck");
        assert_eq!(registry.resolve("ICar"), Some("Truck"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unrelated_capabilities_resolve_independently() {
        let mut registry = TypeMappingRegistry::new();
        registry.register("ICar", "Car");
        registry.register("IModelSpec", "ModelSpec");
        assert_eq!(registry.resolve("ICar"), Some("Car"));
        assert_eq!(registry.resolve("IModelSpec"), Some("ModelSpec"));
        assert_eq!(registry.resolve("IEngine"), None);
    }

    #[test]
    fn mappings_do_not_chain() {
        let mut registry = TypeMappingRegistry::new();
        registry.register("IVehicle", "ICar");
        registry.register("ICar", "Car");
        assert_eq!(registry.resolve("IVehicle"), Some("ICar"));
    }
}
