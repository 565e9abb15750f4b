use crate::reflect::{BoxError, TypeKind};
use std::error::Error as StdError;
use thiserror::Error;

/// Registration rejected by the container
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Type `{0}` is already registered")]
    AlreadyRegistered(&'static str),
    #[error("Type `{0}` cannot be bound to itself")]
    SelfBinding(&'static str),
    #[error("Type `{concrete}` is {kind} and cannot be constructed")]
    NotConstructible {
        concrete: &'static str,
        kind: TypeKind,
    },
    #[error("Type `{concrete}` is not assignable to `{key}`")]
    NotAssignable {
        key: &'static str,
        concrete: &'static str,
    },
}

/// Dependency graph grew past the configured maximum instantiation depth
#[derive(Debug, Clone, Error)]
#[error("Exceeded max instantiation depth {max_depth} at `{type_name}` (depth {depth})")]
pub struct ExceededMaxDepthError {
    pub type_name: &'static str,
    pub depth: u32,
    pub max_depth: u32,
}

/// Underlying reason a resolution failed
#[derive(Debug, Error)]
pub enum ResolveFailure {
    #[error("Type `{type_name}` is {kind} and cannot be constructed")]
    InvalidType {
        type_name: &'static str,
        kind: TypeKind,
    },
    #[error("No satisfiable public constructor for `{0}`")]
    NoConstructor(&'static str),
    #[error("Cannot satisfy parameter `{parameter}` of `{owner}`")]
    UnsatisfiableParameter {
        owner: &'static str,
        parameter: &'static str,
    },
    #[error("Dependency graph is too deep")]
    ExceededMaxDepth(#[from] ExceededMaxDepthError),
    #[error("Factory for `{type_name}` failed: {source}")]
    Factory {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("Constructor of `{type_name}` failed: {source}")]
    Constructor {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("Resolved object is not a `{expected}`")]
    TypeMismatch { expected: &'static str },
    #[error("Cannot assign member `{member}` of `{owner}`: {source}")]
    MemberAssignment {
        owner: &'static str,
        member: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("Container backing the binding for `{0}` has been dropped")]
    ContainerDropped(&'static str),
}

/// Failure of a single `resolve` call, naming the originally requested type
#[derive(Debug, Error)]
#[error("Failed to resolve `{type_name}`: {cause}")]
pub struct ResolutionError {
    type_name: &'static str,
    #[source]
    cause: ResolveFailure,
}

impl ResolutionError {
    pub fn new(type_name: &'static str, cause: ResolveFailure) -> Self {
        Self { type_name, cause }
    }

    /// Requested type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn failure(&self) -> &ResolveFailure {
        &self.cause
    }

    /// Depth failure anywhere in the cause chain, including inside factory errors
    pub fn exceeded_max_depth(&self) -> Option<&ExceededMaxDepthError> {
        self.chain()
            .find_map(|error| error.downcast_ref::<ExceededMaxDepthError>())
    }

    pub fn is_exceeded_max_depth(&self) -> bool {
        self.exceeded_max_depth().is_some()
    }

    /// Deepest error of the cause chain
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn chain<'a>(&'a self) -> impl Iterator<Item = &'a (dyn StdError + 'static)> + 'a {
        let first: &'a (dyn StdError + 'static) = self;
        std::iter::successors(Some(first), |error: &&'a (dyn StdError + 'static)| (*error).source())
    }
}

/// Constructor argument could not be taken as the declared parameter type
#[derive(Debug, Error)]
pub enum ArgumentMismatch {
    #[error("Missing argument {position}, expected `{expected}`")]
    Missing {
        position: usize,
        expected: &'static str,
    },
    #[error("Argument {position} is not a `{expected}`")]
    WrongType {
        position: usize,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{1}' for environment variable {0}")]
    InvalidEnv(&'static str, String),
}
