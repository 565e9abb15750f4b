//! Default instances for collection-shaped types requested directly

use crate::errors::ResolveFailure;
use crate::reflect::{Arguments, Object, Shape, TypeDescriptor};

/// Empty instance of a collection-shaped type
///
/// Arrays come back zero-length, maps and sequences as their empty default. Returns
/// `None` for types without a collection shape.
pub fn empty_instance(descriptor: &TypeDescriptor) -> Option<Result<Object, ResolveFailure>> {
    let shape = descriptor.shape()?;
    let result = match descriptor.empty_constructor() {
        Some(constructor) => constructor
            .invoke(Arguments::empty())
            .map_err(|source| ResolveFailure::Constructor {
                type_name: descriptor.name(),
                source,
            }),
        None => Err(ResolveFailure::NoConstructor(descriptor.name())),
    };
    tracing::debug!(type_name = descriptor.name(), shape = shape_name(shape), "Using empty collection instance");
    Some(result)
}

fn shape_name(shape: Shape) -> &'static str {
    match shape {
        Shape::Array { .. } => "array",
        Shape::Sequence { .. } => "sequence",
        Shape::Map { .. } => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{downcast, Reflect};
    use std::collections::{BTreeMap, VecDeque};

    #[test]
    fn test_empty_instances_per_shape() {
        let array = empty_instance(&<[u32] as Reflect>::describe()).unwrap().unwrap();
        assert_eq!(downcast::<[u32]>(&array).unwrap().len(), 0);

        let map = empty_instance(&BTreeMap::<String, u32>::describe()).unwrap().unwrap();
        assert!(downcast::<BTreeMap<String, u32>>(&map).unwrap().is_empty());

        let queue = empty_instance(&VecDeque::<u8>::describe()).unwrap().unwrap();
        assert!(downcast::<VecDeque<u8>>(&queue).unwrap().is_empty());
    }

    #[test]
    fn test_non_collection_has_no_fallback() {
        assert!(empty_instance(&u32::describe()).is_none());
    }
}
