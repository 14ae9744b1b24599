//! Provider trait: a module of related service registrations.
//!
//! Providers group related services together so that an application can
//! assemble its container from independent pieces, or so that a fork can
//! layer a whole module of overrides at once.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageProvider;
//!
//! impl Provider for StorageProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) {
//!         registry.singleton_with::<Arc<Database>>(|_| {
//!             Ok(Arc::new(Database::connect("postgres://localhost")))
//!         });
//!         registry.register::<Arc<dyn Repository>, PgRepository>(Lifetime::PerScope);
//!     }
//! }
//!
//! let test_container = container.customize();
//! test_container.add_provider(&InMemoryStorageProvider)?;
//! ```

use std::any::type_name;

use crate::constructor::{Injectable, single_constructor_producer};
use crate::error::StratumError;
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::{Producer, Resolver, factory_producer, value_producer};

/// A module that registers related services into a container.
///
/// Implemented by application code; consumed by
/// [`ContainerBuilder::add_provider`](crate::container::ContainerBuilder::add_provider)
/// and [`Container::add_provider`](crate::container::Container::add_provider).
pub trait Provider: Send + Sync {
    /// Register services into the given registry.
    fn register(&self, registry: &mut dyn ProviderRegistry);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Interface that providers use to register services.
///
/// Only the type-erased entry points are required; the typed helpers on
/// `dyn ProviderRegistry` are built on top of them.
pub trait ProviderRegistry {
    /// Register a type-erased producer.
    fn register_producer(&mut self, key: DependencyKey, lifetime: Lifetime, producer: Producer);

    /// Record a registration error to be reported once the provider is done.
    fn record_error(&mut self, error: StratumError);
}

impl dyn ProviderRegistry + '_ {
    /// Register a factory with an explicit lifetime.
    pub fn with_lifetime<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> crate::error::Result<T> + Send + Sync + 'static,
        lifetime: Lifetime,
    ) -> &mut Self {
        self.register_producer(DependencyKey::of::<T>(), lifetime, factory_producer(factory));
        self
    }

    /// Register a singleton factory.
    pub fn singleton_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> crate::error::Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_lifetime(factory, Lifetime::Singleton)
    }

    /// Register a per-scope factory.
    pub fn scoped_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> crate::error::Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_lifetime(factory, Lifetime::PerScope)
    }

    /// Register a transient factory.
    pub fn transient_with<T: Clone + Send + Sync + 'static>(
        &mut self,
        factory: impl Fn(&dyn Resolver) -> crate::error::Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_lifetime(factory, Lifetime::Transient)
    }

    /// Register a pre-built value as a singleton.
    pub fn singleton_value<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.register_producer(DependencyKey::of::<T>(), Lifetime::Singleton, value_producer(value));
        self
    }

    /// Register `I` under `S` through its single constructor.
    ///
    /// An invalid constructor list is recorded as an error instead of
    /// registering anything.
    pub fn register<S, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        S: From<I> + Clone + Send + Sync + 'static,
        I: Injectable,
    {
        match single_constructor_producer::<S, I>() {
            Ok(producer) => self.register_producer(DependencyKey::of::<S>(), lifetime, producer),
            Err(err) => self.record_error(err),
        }
        self
    }
}
