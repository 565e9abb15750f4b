//! Constructor descriptors and closure conversion

use super::{downcast, erase, BoxError, Object, Reflect, TypeRef};
use crate::errors::ArgumentMismatch;
use std::fmt;
use std::sync::Arc;

type Invoke = Arc<dyn Fn(Arguments) -> Result<Object, BoxError> + Send + Sync>;

/// Metadata plus an invoke capability for one candidate constructor
#[derive(Clone)]
pub struct ConstructorDescriptor {
    parameters: Vec<TypeRef>,
    invoke: Invoke,
    public: bool,
    array: bool,
}

impl ConstructorDescriptor {
    pub fn new<F>(parameters: Vec<TypeRef>, invoke: F) -> Self
    where
        F: Fn(Arguments) -> Result<Object, BoxError> + Send + Sync + 'static,
    {
        Self {
            parameters,
            invoke: Arc::new(invoke),
            public: true,
            array: false,
        }
    }

    /// Built-in zero-length constructor of an array-shaped type
    pub fn array<T, F>(empty: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let mut constructor = Self::new(Vec::new(), move |_| Ok(erase(empty())));
        constructor.array = true;
        constructor
    }

    /// Default (parameterless) constructor producing `T`
    pub fn default_of<T, F>(make: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(Vec::new(), move |_| Ok(erase(Arc::new(make()))))
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn parameters(&self) -> &[TypeRef] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn invoke(&self, arguments: Arguments) -> Result<Object, BoxError> {
        (self.invoke)(arguments)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &self.parameters)
            .field("public", &self.public)
            .field("array", &self.array)
            .finish()
    }
}

/// Ordered constructor arguments, consumed front to back
pub struct Arguments {
    values: std::vec::IntoIter<Object>,
    position: usize,
}

impl Arguments {
    pub fn new(values: Vec<Object>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Take the next argument as an `Arc<A>`
    pub fn next<A: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<A>, ArgumentMismatch> {
        let position = self.position;
        self.position += 1;
        let expected = std::any::type_name::<A>();
        let value = self
            .values
            .next()
            .ok_or(ArgumentMismatch::Missing { position, expected })?;
        downcast::<A>(&value).ok_or(ArgumentMismatch::WrongType { position, expected })
    }
}

/// Conversion of a closure taking `Arc<P>` parameters into a constructor of `T`
///
/// `Args` is a marker tuple of the parameter types, which keeps the per-arity impls
/// from overlapping.
pub trait IntoConstructor<T, Args>: Send + Sync + 'static {
    fn into_constructor(self) -> ConstructorDescriptor;
}

macro_rules! impl_into_constructor {
    ($($param:ident),*) => {
        impl<T, F, $($param,)*> IntoConstructor<T, ($(Arc<$param>,)*)> for F
        where
            T: Send + Sync + 'static,
            F: Fn($(Arc<$param>),*) -> T + Send + Sync + 'static,
            $($param: ?Sized + Reflect,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_constructor(self) -> ConstructorDescriptor {
                let parameters = vec![$(TypeRef::of::<$param>()),*];
                ConstructorDescriptor::new(parameters, move |mut arguments: Arguments| {
                    $(let $param = arguments.next::<$param>()?;)*
                    Ok(erase(Arc::new((self)($($param),*))))
                })
            }
        }
    };
}

impl_into_constructor!();
impl_into_constructor!(P1);
impl_into_constructor!(P1, P2);
impl_into_constructor!(P1, P2, P3);
impl_into_constructor!(P1, P2, P3, P4);
impl_into_constructor!(P1, P2, P3, P4, P5);
impl_into_constructor!(P1, P2, P3, P4, P5, P6);
impl_into_constructor!(P1, P2, P3, P4, P5, P6, P7);
impl_into_constructor!(P1, P2, P3, P4, P5, P6, P7, P8);
