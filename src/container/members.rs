//! Post-construction member injection

use super::Container;
use crate::errors::{ResolutionError, ResolveFailure};
use crate::reflect::{Object, TypeDescriptor};

/// Fill every unset member of `target` whose type the container can resolve
///
/// Returns the number of members assigned. With `suppress_exceptions` a member that
/// fails to resolve is logged and skipped instead of aborting the whole pass.
pub(crate) fn inject(
    container: &Container,
    descriptor: &TypeDescriptor,
    target: &Object,
    suppress_exceptions: bool,
) -> Result<usize, ResolutionError> {
    let mut assigned = 0;
    for member in descriptor.members() {
        if member.is_set(target) != Some(false) {
            continue;
        }
        let member_type = member.member_type();
        if !container.can_resolve_type(member_type) {
            tracing::trace!(member = member.name(), member_type = member_type.name(), "Member type not resolvable");
            continue;
        }

        let outcome = container.resolve_type(member_type).and_then(|value| {
            member.assign(target, &value).map_err(|source| {
                ResolutionError::new(
                    member_type.name(),
                    ResolveFailure::MemberAssignment {
                        owner: descriptor.name(),
                        member: member.name(),
                        source,
                    },
                )
            })
        });

        match outcome {
            Ok(true) => {
                assigned += 1;
                tracing::debug!(owner = descriptor.name(), member = member.name(), "Injected member");
            }
            Ok(false) => {}
            Err(error) if suppress_exceptions => {
                tracing::warn!(
                    owner = descriptor.name(),
                    member = member.name(),
                    error = %error,
                    "Suppressed member injection failure"
                );
            }
            Err(error) => return Err(error),
        }
    }
    Ok(assigned)
}
