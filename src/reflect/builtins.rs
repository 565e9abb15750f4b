//! Descriptors for primitives, strings, callables and std collections

use super::{Reflect, TypeDescriptor};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

macro_rules! reflect_kind {
    ($kind:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::$kind::<Self>()
                }
            }
        )+
    };
}

reflect_kind!(value: bool, char, (), u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);
reflect_kind!(text: String, str, &'static str, Box<str>);

macro_rules! reflect_callable {
    ($($param:ident),*) => {
        impl<R: 'static, $($param: 'static,)*> Reflect for fn($($param),*) -> R {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::callable::<Self>()
            }
        }

        impl<R: 'static, $($param: 'static,)*> Reflect for dyn Fn($($param),*) -> R + Send + Sync {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::callable::<Self>()
            }
        }
    };
}

reflect_callable!();
reflect_callable!(A1);
reflect_callable!(A1, A2);
reflect_callable!(A1, A2, A3);

impl<E: Reflect> Reflect for Vec<E> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self, E>(Vec::new).build()
    }
}

impl<E: Reflect> Reflect for VecDeque<E> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self, E>(VecDeque::new).build()
    }
}

impl<E: Reflect> Reflect for LinkedList<E> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self, E>(LinkedList::new).build()
    }
}

impl<E: Reflect + Eq + Hash> Reflect for HashSet<E> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self, E>(HashSet::new).build()
    }
}

impl<E: Reflect + Ord> Reflect for BTreeSet<E> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self, E>(BTreeSet::new).build()
    }
}

impl<K: Reflect + Eq + Hash, V: Reflect> Reflect for HashMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map::<Self, K, V>(HashMap::new).build()
    }
}

impl<K: Reflect + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map::<Self, K, V>(BTreeMap::new).build()
    }
}

impl<E: Reflect> Reflect for [E] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array::<Self, E>(empty_slice::<E>).build()
    }
}

fn empty_slice<E>() -> Arc<[E]> {
    Arc::from(Vec::new())
}

#[cfg(test)]
mod tests {
    use crate::reflect::{downcast, Arguments, Shape, TypeKind, TypeRef};
    use super::*;

    #[test]
    fn test_primitive_kinds() {
        assert_eq!(u32::describe().kind(), TypeKind::Value);
        assert_eq!(f64::describe().kind(), TypeKind::Value);
        assert_eq!(String::describe().kind(), TypeKind::Text);
        assert_eq!(<str as Reflect>::describe().kind(), TypeKind::Text);
        assert_eq!(<fn() -> u8 as Reflect>::describe().kind(), TypeKind::Callable);
        assert_eq!(<dyn Fn(u8) -> u8 + Send + Sync as Reflect>::describe().kind(), TypeKind::Callable);
    }

    #[test]
    fn test_collection_shapes() {
        let list = Vec::<String>::describe();
        assert_eq!(
            list.shape(),
            Some(Shape::Sequence {
                element: TypeRef::of::<String>()
            })
        );

        let map = HashMap::<String, u32>::describe();
        assert_eq!(
            map.shape(),
            Some(Shape::Map {
                key: TypeRef::of::<String>(),
                value: TypeRef::of::<u32>()
            })
        );

        let array = <[u16] as Reflect>::describe();
        assert!(matches!(array.shape(), Some(Shape::Array { .. })));
        assert!(array.empty_constructor().unwrap().is_array());
    }

    #[test]
    fn test_empty_constructors_build_empty_instances() {
        let set = BTreeSet::<u8>::describe();
        let object = set.empty_constructor().unwrap().invoke(Arguments::empty()).unwrap();
        assert!(downcast::<BTreeSet<u8>>(&object).unwrap().is_empty());

        let array = <[u16] as Reflect>::describe();
        let object = array.empty_constructor().unwrap().invoke(Arguments::empty()).unwrap();
        assert_eq!(downcast::<[u16]>(&object).unwrap().len(), 0);
    }
}
