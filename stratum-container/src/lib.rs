//! Core container implementation for Stratum DI.

pub mod constructor;
pub mod container;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod registry;
pub mod scope;

pub use constructor::{Constructor, Injectable};
pub use container::{Container, ContainerBuilder, prelude};
pub use error::{Result, StratumError};
pub use key::DependencyKey;
pub use lifetime::Lifetime;
pub use registry::{Resolver, ResolverApi};
pub use scope::Scope;
