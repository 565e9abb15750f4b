//! Constructor-driven dependency resolution
//!
//! Types describe their constructors through [`Reflect`]; the [`Container`] builds
//! the requested type by satisfying constructor parameters breadth-first, bounded by
//! a maximum instantiation depth.

pub mod config;
pub mod container;
pub mod errors;
pub mod logging;
pub mod reflect;

// Re-export commonly used items for convenience
pub use config::ContainerConfig;
pub use container::{Container, ContainerStats, ObserverId};
pub use errors::{ExceededMaxDepthError, RegistrationError, ResolutionError, ResolveFailure};
pub use reflect::{BoxError, Object, Reflect, Slot, TypeDescriptor, TypeKind, TypeRef};
