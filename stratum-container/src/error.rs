//! Error types for Stratum container operations.
//!
//! Every message names the service by its fully qualified type name and
//! carries a hint on how to fix the problem.

use std::fmt;

use stratum_support::rendering::render_chain;

use crate::key::DependencyKey;

/// Main error type for all Stratum operations.
#[derive(Debug, thiserror::Error)]
pub enum StratumError {
    /// Requested service is not registered at any container level.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A constructor registration targeted a type that does not declare
    /// exactly one constructor.
    #[error("{}", .0)]
    InvalidRegistration(InvalidRegistrationError),

    /// Factory returned an error, or produced a value of the wrong type.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: DependencyKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Service was already registered in a builder that forbids overrides.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),
}

impl StratumError {
    /// Wraps an arbitrary factory error as a construction failure of `T`.
    pub fn construction<T: ?Sized + 'static>(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StratumError::ConstructionFailed {
            key: DependencyKey::of::<T>(),
            source: source.into(),
        }
    }
}

/// Error when a service was not registered.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The service that was requested
    pub requested: DependencyKey,
    /// Services whose construction led to this request, outermost first
    pub required_by: Vec<DependencyKey>,
    /// Similar types that ARE registered
    pub suggestions: Vec<DependencyKey>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type {} is not registered in the container", self.requested)?;

        if !self.required_by.is_empty() {
            let chain: Vec<String> = self
                .required_by
                .iter()
                .chain(std::iter::once(&self.requested))
                .map(DependencyKey::short_name)
                .collect();
            write!(f, "\n  Required by: {}", render_chain(&chain))?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to call .register::<{}, _>() or .register_with::<{}>()?",
            self.requested.short_name(),
            self.requested.short_name(),
        )
    }
}

/// Error when a constructor registration targets a type with zero or
/// several constructors.
#[derive(Debug)]
pub struct InvalidRegistrationError {
    /// The service key the registration was meant for
    pub service: DependencyKey,
    /// The implementation type whose constructors were inspected
    pub implementation: DependencyKey,
    /// How many constructors the implementation declares
    pub constructors: usize,
}

impl fmt::Display for InvalidRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot register {} as {}: type should have a single public constructor, found {}",
            self.implementation, self.service, self.constructors,
        )?;
        write!(
            f,
            "\n  Hint: Use .register_with::<{}>(factory) to construct it explicitly",
            self.service.short_name(),
        )
    }
}

/// Error when trying to register a service that already exists.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: DependencyKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: Enable .allow_override(true) on the builder, or register on a customized fork"
        )
    }
}

/// Convenient Result type for Stratum operations.
pub type Result<T> = std::result::Result<T, StratumError>;
