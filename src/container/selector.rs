//! Constructor selection for unregistered types

use super::registry::Registry;
use crate::reflect::{ConstructorDescriptor, TypeDescriptor};

/// Pick the constructor used to build `descriptor` without a registration
///
/// Collection-shaped types use their default instance constructor, or the constructor
/// of a registered concrete type. Other types use the public constructor with the most
/// parameters among those whose parameters can all be synthesized; equal counts go to
/// the last one declared.
pub fn select_constructor(descriptor: &TypeDescriptor, registry: &Registry) -> Option<ConstructorDescriptor> {
    if descriptor.is_collection() {
        return select_collection_constructor(descriptor, registry);
    }
    if !descriptor.kind().is_constructible() {
        return None;
    }

    let mut selected: Option<&ConstructorDescriptor> = None;
    for constructor in descriptor.public_constructors() {
        if !is_satisfiable(constructor) {
            tracing::trace!(
                type_name = descriptor.name(),
                arity = constructor.arity(),
                "Skipping constructor with unsynthesizable parameter"
            );
            continue;
        }
        if selected.map_or(true, |current| constructor.arity() >= current.arity()) {
            selected = Some(constructor);
        }
    }
    selected.cloned()
}

/// Resolution checks the registry before selecting, so the redirect only applies to direct
/// callers of [`select_constructor`]
fn select_collection_constructor(
    descriptor: &TypeDescriptor,
    registry: &Registry,
) -> Option<ConstructorDescriptor> {
    let concrete = registry
        .get(descriptor.type_ref())
        .and_then(|registration| registration.concrete())
        .filter(|concrete| *concrete != descriptor.type_ref());
    if let Some(concrete) = concrete {
        return select_constructor(&concrete.descriptor(), registry);
    }
    if !descriptor.kind().is_constructible() {
        return None;
    }
    descriptor.empty_constructor().cloned()
}

fn is_satisfiable(constructor: &ConstructorDescriptor) -> bool {
    constructor
        .parameters()
        .iter()
        .all(|parameter| !parameter.descriptor().kind().is_unsynthesizable())
}
