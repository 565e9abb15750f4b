//! Type-to-factory binding table

use crate::errors::RegistrationError;
use crate::reflect::{BoxError, Object, TypeRef};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Zero-argument factory stored for a key
pub type Factory = Arc<dyn Fn() -> Result<Object, BoxError> + Send + Sync>;

/// How a registration was created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// User supplied factory
    Factory,
    /// Type-to-type binding resolved on demand
    Binding,
}

/// One registry entry
#[derive(Clone)]
pub struct Registration {
    key: TypeRef,
    factory: Factory,
    concrete: Option<TypeRef>,
    origin: Origin,
}

impl Registration {
    pub fn from_factory(key: TypeRef, factory: Factory) -> Self {
        Self {
            key,
            factory,
            concrete: None,
            origin: Origin::Factory,
        }
    }

    pub fn binding(key: TypeRef, concrete: TypeRef, factory: Factory) -> Self {
        Self {
            key,
            factory,
            concrete: Some(concrete),
            origin: Origin::Binding,
        }
    }

    pub fn key(&self) -> TypeRef {
        self.key
    }

    /// Concrete type the factory was derived from
    pub fn concrete(&self) -> Option<TypeRef> {
        self.concrete
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn invoke(&self) -> Result<Object, BoxError> {
        (self.factory)()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("concrete", &self.concrete)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Concurrent registry keyed by `TypeId`
///
/// Lookups clone the registration out of the map, so no shard lock is held while a
/// factory runs and factories are free to call back into the container.
#[derive(Default)]
pub struct Registry {
    entries: DashMap<TypeId, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic insert-if-absent
    pub fn insert(&self, registration: Registration) -> Result<(), RegistrationError> {
        match self.entries.entry(registration.key.id()) {
            Entry::Occupied(_) => Err(RegistrationError::AlreadyRegistered(registration.key.name())),
            Entry::Vacant(vacant) => {
                vacant.insert(registration);
                Ok(())
            }
        }
    }

    pub fn remove(&self, key: TypeRef) -> bool {
        self.entries.remove(&key.id()).is_some()
    }

    pub fn get(&self, key: TypeRef) -> Option<Registration> {
        self.entries.get(&key.id()).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: TypeRef) -> bool {
        self.entries.contains_key(&key.id())
    }

    /// Snapshot of the registered keys
    pub fn keys(&self) -> Vec<TypeRef> {
        self.entries.iter().map(|entry| entry.value().key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{downcast, erase};

    fn constant(value: u32) -> Factory {
        Arc::new(move || -> Result<Object, BoxError> { Ok(erase(Arc::new(value))) })
    }

    #[test]
    fn test_insert_if_absent() {
        let registry = Registry::new();
        let key = TypeRef::of::<u32>();

        registry.insert(Registration::from_factory(key, constant(1))).unwrap();
        let duplicate = registry.insert(Registration::from_factory(key, constant(2)));
        assert!(matches!(duplicate, Err(RegistrationError::AlreadyRegistered(_))));

        let stored = registry.get(key).unwrap();
        assert_eq!(*downcast::<u32>(&stored.invoke().unwrap()).unwrap(), 1);
        assert_eq!(stored.origin(), Origin::Factory);
        assert_eq!(stored.concrete(), None);
    }

    #[test]
    fn test_remove_and_keys() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        registry
            .insert(Registration::from_factory(TypeRef::of::<u32>(), constant(1)))
            .unwrap();
        registry
            .insert(Registration::binding(TypeRef::of::<u64>(), TypeRef::of::<u32>(), constant(2)))
            .unwrap();

        assert_eq!(registry.len(), 2);
        let keys = registry.keys();
        assert!(keys.contains(&TypeRef::of::<u32>()));
        assert!(keys.contains(&TypeRef::of::<u64>()));
        assert_eq!(registry.get(TypeRef::of::<u64>()).unwrap().origin(), Origin::Binding);

        assert!(registry.remove(TypeRef::of::<u32>()));
        assert!(!registry.remove(TypeRef::of::<u32>()));
        assert!(!registry.contains(TypeRef::of::<u32>()));
    }

    #[test]
    fn test_concurrent_insert_accepts_exactly_one() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .insert(Registration::from_factory(TypeRef::of::<u32>(), constant(i)))
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(registry.len(), 1);
    }
}
