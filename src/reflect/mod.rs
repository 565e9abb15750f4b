//! Type metadata used by the resolution engine
//!
//! Rust has no runtime reflection, so every resolvable type describes itself through
//! [`Reflect`]. The engine only ever asks questions through [`TypeRef`] and
//! [`TypeDescriptor`], which keeps the resolution algorithm independent of how the
//! metadata was produced.

mod builtins;
mod constructor;
mod descriptor;

pub use constructor::{Arguments, ConstructorDescriptor, IntoConstructor};
pub use descriptor::{DescriptorBuilder, MemberDescriptor, Shape, Slot, TypeDescriptor, Upcast};

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased resolved value
///
/// The erased value is always an `Arc<T>`, which lets sized types and `dyn Trait`
/// interface types travel through the engine the same way.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Error type returned by factories and constructors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Erase a shared value into an [`Object`]
pub fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Object {
    Arc::new(value)
}

/// Recover the shared value stored by [`erase`]
pub fn downcast<T: ?Sized + Send + Sync + 'static>(object: &Object) -> Option<Arc<T>> {
    object.downcast_ref::<Arc<T>>().cloned()
}

/// A type that can describe its construction metadata
///
/// Implemented for user structs (usually with [`TypeDescriptor::concrete`]), for
/// interface types such as `dyn Repository`, and for the built-in primitives and
/// std collections.
pub trait Reflect: Send + Sync + 'static {
    fn describe() -> TypeDescriptor;
}

/// Capability class of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Instantiable through its constructors
    Concrete,
    /// Abstract base, only reachable through a registration
    Abstract,
    /// Trait object type
    Interface,
    /// Plain data such as integers, floats and booleans
    Value,
    /// Function pointer or closure type
    Callable,
    /// String-like primitive
    Text,
}

impl TypeKind {
    pub fn is_constructible(self) -> bool {
        matches!(self, TypeKind::Concrete)
    }

    /// Parameters of these kinds can never be synthesized by the engine
    pub fn is_unsynthesizable(self) -> bool {
        matches!(self, TypeKind::Value | TypeKind::Callable | TypeKind::Text)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TypeKind::Concrete => "a concrete type",
            TypeKind::Abstract => "an abstract type",
            TypeKind::Interface => "an interface",
            TypeKind::Value => "a value type",
            TypeKind::Callable => "a callable type",
            TypeKind::Text => "a text primitive",
        };
        f.write_str(text)
    }
}

lazy_static! {
    static ref DESCRIPTORS: DashMap<TypeId, Arc<TypeDescriptor>> = DashMap::new();
}

/// Lightweight handle naming a reflectable type
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl TypeRef {
    pub fn of<T: ?Sized + Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            describe: <T as Reflect>::describe,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Descriptor for this type, built once and cached process-wide
    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        if let Some(cached) = DESCRIPTORS.get(&self.id) {
            return cached.value().clone();
        }
        // describe() runs outside the map lock; a racing thread may build it too
        let built = Arc::new((self.describe)());
        DESCRIPTORS.entry(self.id).or_insert(built).value().clone()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
