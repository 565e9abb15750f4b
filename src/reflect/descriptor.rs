//! Type descriptors and their builder

use super::constructor::{ConstructorDescriptor, IntoConstructor};
use super::{downcast, erase, BoxError, Object, Reflect, TypeKind, TypeRef};
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collection shape of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array { element: TypeRef },
    Sequence { element: TypeRef },
    Map { key: TypeRef, value: TypeRef },
}

/// Conversion from a concrete type to one of the interfaces it implements
#[derive(Clone)]
pub struct Upcast {
    target: TypeRef,
    cast: Arc<dyn Fn(&Object) -> Option<Object> + Send + Sync>,
}

impl Upcast {
    pub fn target(&self) -> TypeRef {
        self.target
    }

    pub fn apply(&self, object: &Object) -> Option<Object> {
        (self.cast)(object)
    }
}

/// An injectable member backed by a [`Slot`]
#[derive(Clone)]
pub struct MemberDescriptor {
    name: &'static str,
    member_type: TypeRef,
    is_set: Arc<dyn Fn(&Object) -> Option<bool> + Send + Sync>,
    assign: Arc<dyn Fn(&Object, &Object) -> Result<bool, BoxError> + Send + Sync>,
}

impl MemberDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn member_type(&self) -> TypeRef {
        self.member_type
    }

    /// `None` when `target` is not an instance of the owning type
    pub fn is_set(&self, target: &Object) -> Option<bool> {
        (self.is_set)(target)
    }

    /// Store `value` into the member; returns false when the slot was already filled
    pub fn assign(&self, target: &Object, value: &Object) -> Result<bool, BoxError> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("member_type", &self.member_type)
            .finish()
    }
}

/// Interior-mutable holder for a member filled after construction
pub struct Slot<T: ?Sized> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Slot<T> {
    pub fn empty() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    pub fn with(value: Arc<T>) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.value.read().is_some()
    }

    /// Fill the slot unless it already holds a value
    pub fn set(&self, value: Arc<T>) -> bool {
        let mut guard = self.value.write();
        if guard.is_some() {
            return false;
        }
        *guard = Some(value);
        true
    }
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("set", &self.is_set()).finish()
    }
}

/// Everything the engine knows about one type
pub struct TypeDescriptor {
    type_ref: TypeRef,
    kind: TypeKind,
    public: bool,
    shape: Option<Shape>,
    empty: Option<ConstructorDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    implements: Vec<Upcast>,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    fn bare(type_ref: TypeRef, kind: TypeKind) -> Self {
        Self {
            type_ref,
            kind,
            public: true,
            shape: None,
            empty: None,
            constructors: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Start describing an instantiable struct
    pub fn concrete<T: Reflect>() -> DescriptorBuilder<T> {
        DescriptorBuilder::new(Self::bare(TypeRef::of::<T>(), TypeKind::Concrete))
    }

    pub fn abstract_type<T: ?Sized + Reflect>() -> DescriptorBuilder<T> {
        DescriptorBuilder::new(Self::bare(TypeRef::of::<T>(), TypeKind::Abstract))
    }

    pub fn interface<T: ?Sized + Reflect>() -> Self {
        Self::bare(TypeRef::of::<T>(), TypeKind::Interface)
    }

    pub fn value<T: ?Sized + Reflect>() -> Self {
        Self::bare(TypeRef::of::<T>(), TypeKind::Value)
    }

    pub fn callable<T: ?Sized + Reflect>() -> Self {
        Self::bare(TypeRef::of::<T>(), TypeKind::Callable)
    }

    pub fn text<T: ?Sized + Reflect>() -> Self {
        Self::bare(TypeRef::of::<T>(), TypeKind::Text)
    }

    /// Growable sequence whose default instance comes from `empty`
    pub fn sequence<T, E>(empty: fn() -> T) -> DescriptorBuilder<T>
    where
        T: Reflect,
        E: ?Sized + Reflect,
    {
        let mut descriptor = Self::bare(TypeRef::of::<T>(), TypeKind::Concrete);
        descriptor.shape = Some(Shape::Sequence {
            element: TypeRef::of::<E>(),
        });
        descriptor.empty = Some(ConstructorDescriptor::default_of(empty));
        DescriptorBuilder::new(descriptor)
    }

    pub fn map<T, K, V>(empty: fn() -> T) -> DescriptorBuilder<T>
    where
        T: Reflect,
        K: ?Sized + Reflect,
        V: ?Sized + Reflect,
    {
        let mut descriptor = Self::bare(TypeRef::of::<T>(), TypeKind::Concrete);
        descriptor.shape = Some(Shape::Map {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
        });
        descriptor.empty = Some(ConstructorDescriptor::default_of(empty));
        DescriptorBuilder::new(descriptor)
    }

    /// Fixed-length array; `empty` yields the zero-length instance
    pub fn array<T, E>(empty: fn() -> Arc<T>) -> DescriptorBuilder<T>
    where
        T: ?Sized + Reflect,
        E: ?Sized + Reflect,
    {
        let mut descriptor = Self::bare(TypeRef::of::<T>(), TypeKind::Concrete);
        descriptor.shape = Some(Shape::Array {
            element: TypeRef::of::<E>(),
        });
        descriptor.empty = Some(ConstructorDescriptor::array(empty));
        DescriptorBuilder::new(descriptor)
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn name(&self) -> &'static str {
        self.type_ref.name()
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn shape(&self) -> Option<Shape> {
        self.shape
    }

    pub fn is_collection(&self) -> bool {
        self.shape.is_some()
    }

    /// Constructor of the default instance for a collection-shaped type
    pub fn empty_constructor(&self) -> Option<&ConstructorDescriptor> {
        self.empty.as_ref()
    }

    /// Constructors in declaration order
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn public_constructors(&self) -> impl Iterator<Item = &ConstructorDescriptor> {
        self.constructors.iter().filter(|c| c.is_public())
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn implements(&self) -> &[Upcast] {
        &self.implements
    }

    /// Whether an instance of this type can be stored under `key`
    pub fn is_assignable_to(&self, key: TypeRef) -> bool {
        self.type_ref == key || self.upcast_to(key).is_some()
    }

    pub fn upcast_to(&self, key: TypeRef) -> Option<&Upcast> {
        self.implements.iter().find(|u| u.target == key)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.type_ref)
            .field("kind", &self.kind)
            .field("public", &self.public)
            .field("shape", &self.shape)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members)
            .finish()
    }
}

/// Fluent builder returned by the [`TypeDescriptor`] constructors
pub struct DescriptorBuilder<T: ?Sized> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Reflect> DescriptorBuilder<T> {
    fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    /// Hide the type from shallow resolvability checks
    pub fn private(mut self) -> Self {
        self.descriptor.public = false;
        self
    }

    /// Declare that `T` can be used wherever `I` is requested
    pub fn implements<I: ?Sized + Reflect>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self {
        self.descriptor.implements.push(Upcast {
            target: TypeRef::of::<I>(),
            cast: Arc::new(move |object: &Object| downcast::<T>(object).map(|value| erase(cast(value)))),
        });
        self
    }

    /// Declare a member that can be filled by member injection
    pub fn member<M: ?Sized + Reflect>(mut self, name: &'static str, slot: fn(&T) -> &Slot<M>) -> Self {
        self.descriptor.members.push(MemberDescriptor {
            name,
            member_type: TypeRef::of::<M>(),
            is_set: Arc::new(move |target: &Object| downcast::<T>(target).map(|owner| slot(&owner).is_set())),
            assign: Arc::new(move |target: &Object, value: &Object| -> Result<bool, BoxError> {
                let owner = downcast::<T>(target).ok_or_else(|| {
                    format!("member `{}` does not belong to `{}`", name, std::any::type_name::<T>())
                })?;
                let value = downcast::<M>(value).ok_or_else(|| {
                    format!("value for member `{}` is not a `{}`", name, std::any::type_name::<M>())
                })?;
                Ok(slot(&owner).set(value))
            }),
        });
        self
    }

    /// Add a hand-built constructor, e.g. one whose invocation can fail
    pub fn constructor_descriptor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.descriptor.constructors.push(constructor);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl<T: Reflect> DescriptorBuilder<T> {
    /// Add a public constructor; declaration order matters for tie-breaking
    pub fn constructor<Args, F: IntoConstructor<T, Args>>(mut self, make: F) -> Self {
        self.descriptor.constructors.push(make.into_constructor());
        self
    }

    pub fn private_constructor<Args, F: IntoConstructor<T, Args>>(mut self, make: F) -> Self {
        self.descriptor.constructors.push(make.into_constructor().private());
        self
    }
}

impl<T: ?Sized + Reflect> From<DescriptorBuilder<T>> for TypeDescriptor {
    fn from(builder: DescriptorBuilder<T>) -> Self {
        builder.build()
    }
}
