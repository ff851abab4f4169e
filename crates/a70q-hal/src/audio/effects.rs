//! Effect id registry
//!
//! Clients refer to effects by a numeric id; the vendor wants the native
//! handle. The registry is owned by whoever composes the HAL and is shared
//! with every device and stream.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Opaque native effect handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// Maps effect ids to native handles
#[derive(Debug, Default)]
pub struct EffectRegistry {
    inner: RwLock<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    effects: HashMap<u64, EffectHandle>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle and return its id
    ///
    /// Registering the same handle twice returns the existing id.
    pub fn add(&self, handle: EffectHandle) -> u64 {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, _)) = state.effects.iter().find(|(_, h)| **h == handle) {
            return *id;
        }
        state.next_id += 1;
        let id = state.next_id;
        state.effects.insert(id, handle);
        tracing::debug!("Registered effect {:?} as id {}", handle, id);
        id
    }

    /// Look up the handle registered under `id`
    pub fn get(&self, id: u64) -> Option<EffectHandle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .effects
            .get(&id)
            .copied()
    }

    /// Drop a handle from the registry
    pub fn remove(&self, handle: EffectHandle) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.effects.retain(|_, h| *h != handle);
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .effects
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let registry = EffectRegistry::new();
        let id = registry.add(EffectHandle(0xfeed));
        assert_ne!(id, 0);
        assert_eq!(registry.get(id), Some(EffectHandle(0xfeed)));
        assert_eq!(registry.get(id + 1), None);
    }

    #[test]
    fn test_duplicate_handle_keeps_id() {
        let registry = EffectRegistry::new();
        let first = registry.add(EffectHandle(1));
        assert_eq!(registry.add(EffectHandle(1)), first);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = EffectRegistry::new();
        let id = registry.add(EffectHandle(9));
        registry.remove(EffectHandle(9));
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
    }
}
