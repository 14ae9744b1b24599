//! # The Container: heart of Stratum
//!
//! The dependency injection container that registers services, resolves
//! object graphs and applies lifetime policies.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container (root level)
//!                                   │
//!                              customize()
//!                                   │
//!                                   ▼
//!                               Container (fork) ── parent ──> root
//!                                   │
//!                             create_scope()
//!                                   │
//!                                   ▼
//!                                 Scope
//! ```
//!
//! Every level owns its registrations. A lookup that misses on a fork
//! walks up to the parent, then the grandparent, and so on. Forks never
//! modify their parent.
//!
//! # Examples
//! ```rust
//! use stratum_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! #[derive(Clone)]
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register_with::<Arc<dyn Logger>>(
//!         |_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>),
//!         Lifetime::Singleton,
//!     )
//!     .register_with::<UserService>(
//!         |r| Ok(UserService { logger: r.resolve()? }),
//!         Lifetime::Transient,
//!     );
//!
//! let service: UserService = container.resolve().expect("Failed to resolve");
//! let fork = container.customize();
//! let again: UserService = fork.resolve().expect("Failed to resolve");
//! assert!(Arc::ptr_eq(&service.logger, &again.logger));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use stratum_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace};

use crate::constructor::{Injectable, single_constructor_producer};
use crate::error::{AlreadyRegisteredError, NotRegisteredError, Result, StratumError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::provider::{Provider, ProviderRegistry};
use crate::registry::{
    DecoratorFn, Instance, Producer, ProducerKind, Registration, Registry, Resolver,
    downcast_instance, factory_producer, value_producer,
};
use crate::scope::Scope;

/// How many "did you mean" suggestions a missing-service error carries.
const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a root [`Container`] from a batch of registrations.
///
/// Registration errors are deferred and reported by
/// [`build()`](ContainerBuilder::build).
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .singleton_value(Config::load())
///     .singleton_with::<Arc<Database>>(|r| { ... })
///     .register::<OrderService, OrderService>(Lifetime::Transient)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    registry: Registry,
    allow_override: bool,
    errors: Vec<StratumError>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            allow_override: true,
            errors: Vec::new(),
        }
    }

    /// Allow a later registration to replace an earlier one for the same
    /// type. Enabled by default; when disabled, duplicates make
    /// [`build()`](ContainerBuilder::build) fail.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    // ── Singleton: pre-built value ──

    /// Register a pre-built value as a singleton.
    ///
    /// Cloned on every resolve (use `Arc<T>` for cheap sharing).
    pub fn singleton_value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.push(Registration::factory(
            DependencyKey::of::<T>(),
            Lifetime::Singleton,
            value_producer(value),
        ));
        self
    }

    // ── Factories ──

    /// Register a singleton factory, called once on first resolve.
    pub fn singleton_with<T: Clone + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.with_lifetime(factory, Lifetime::Singleton)
    }

    /// Register a per-scope factory, called once per resolution scope.
    pub fn scoped_with<T: Clone + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.with_lifetime(factory, Lifetime::PerScope)
    }

    /// Register a transient factory, called on every resolve.
    pub fn transient_with<T: Clone + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.with_lifetime(factory, Lifetime::Transient)
    }

    /// Register a factory with an explicit lifetime.
    pub fn with_lifetime<T: Clone + Send + Sync + 'static>(
        mut self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
        lifetime: Lifetime,
    ) -> Self {
        self.push(Registration::factory(
            DependencyKey::of::<T>(),
            lifetime,
            factory_producer(factory),
        ));
        self
    }

    // ── Constructors ──

    /// Register `I` under the service type `S`, built from its single
    /// declared constructor.
    pub fn register<S, I>(mut self, lifetime: Lifetime) -> Self
    where
        S: From<I> + Clone + Send + Sync + 'static,
        I: Injectable,
    {
        match single_constructor_producer::<S, I>() {
            Ok(producer) => {
                self.push(Registration::factory(DependencyKey::of::<S>(), lifetime, producer))
            }
            Err(err) => self.errors.push(err),
        }
        self
    }

    // ── Provider modules ──

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    // ── Build ──

    /// Build the root container.
    ///
    /// # Errors
    /// The first registration error recorded while building, if any.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(mut self) -> Result<Container> {
        info!(registered = self.registry.len(), "Building container");

        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        info!("Container built successfully ✓");
        Ok(Container::from_level(Level {
            registry: self.registry,
            parent: None,
            depth: 0,
        }))
    }

    // ── Internal ──

    fn push(&mut self, registration: Registration) {
        if !self.allow_override && self.registry.contains(&registration.key) {
            self.errors.push(StratumError::AlreadyRegistered(AlreadyRegisteredError {
                key: registration.key,
            }));
            return;
        }
        self.registry.insert(registration);
    }
}

impl ProviderRegistry for ContainerBuilder {
    fn register_producer(&mut self, key: DependencyKey, lifetime: Lifetime, producer: Producer) {
        self.push(Registration::factory(key, lifetime, producer));
    }

    fn record_error(&mut self, error: StratumError) {
        self.errors.push(error);
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registered", &self.registry.len())
            .field("allow_override", &self.allow_override)
            .field("errors", &self.errors.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// One level of the fork chain.
struct Level {
    registry: Registry,
    parent: Option<Container>,
    depth: usize,
}

/// Thread-safe dependency injection container.
///
/// `Container` is a cheap handle: cloning it shares the same level.
/// Use [`customize()`](Container::customize) to get an independent fork.
#[derive(Clone)]
pub struct Container {
    level: Arc<Level>,
}

impl Container {
    /// Create an empty root container.
    pub fn new() -> Self {
        Self::from_level(Level {
            registry: Registry::new(),
            parent: None,
            depth: 0,
        })
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_level(level: Level) -> Self {
        Self {
            level: Arc::new(level),
        }
    }

    // ── Registration ──

    /// Register `I` under the service type `S`, built from its single
    /// declared constructor. Each constructor argument is resolved from
    /// the active scope when an instance is produced.
    ///
    /// Registering the same `S` again at this level replaces the previous
    /// registration. Parent levels are never touched.
    ///
    /// # Errors
    /// [`StratumError::InvalidRegistration`] if `I` declares zero or
    /// several constructors.
    pub fn register<S, I>(&self, lifetime: Lifetime) -> Result<&Self>
    where
        S: From<I> + Clone + Send + Sync + 'static,
        I: Injectable,
    {
        let producer = single_constructor_producer::<S, I>()?;
        self.insert(Registration::factory(DependencyKey::of::<S>(), lifetime, producer));
        Ok(self)
    }

    /// Register a factory for `S`.
    ///
    /// The factory receives a [`Resolver`] bound to the active scope, so
    /// anything it resolves shares that scope's instances.
    pub fn register_with<S: Clone + Send + Sync + 'static>(
        &self,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
        lifetime: Lifetime,
    ) -> &Self {
        self.insert(Registration::factory(
            DependencyKey::of::<S>(),
            lifetime,
            factory_producer(factory),
        ));
        self
    }

    /// Register a pre-built value as a singleton of this level.
    pub fn register_value<S: Clone + Send + Sync + 'static>(&self, value: S) -> &Self {
        self.insert(Registration::factory(
            DependencyKey::of::<S>(),
            Lifetime::Singleton,
            value_producer(value),
        ));
        self
    }

    /// Wrap the nearest existing registration of `S`.
    ///
    /// The new registration lives at this level and keeps the lifetime of
    /// the one it wraps. Each produced instance is the wrapped
    /// registration's instance passed through `decorator`.
    ///
    /// A registration made at this level is wrapped as it is now. An
    /// inherited one is looked up again on every resolve, so re-registering
    /// `S` on an ancestor changes what the decorator wraps.
    ///
    /// # Errors
    /// [`StratumError::NotRegistered`] if no level registers `S`.
    pub fn decorate<S: Clone + Send + Sync + 'static>(
        &self,
        decorator: impl Fn(S, &dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> Result<&Self> {
        let key = DependencyKey::of::<S>();
        let (owner, nearest) = self.find_registration(&key).ok_or_else(|| {
            StratumError::NotRegistered(NotRegisteredError {
                requested: key,
                required_by: Vec::new(),
                suggestions: self.suggestions_for(&key),
            })
        })?;
        let lifetime = nearest.lifetime;
        let inner = Container::ptr_eq(&owner, self).then_some(nearest);

        let decorate: DecoratorFn = Arc::new(move |instance: Instance, resolver: &dyn Resolver| {
            let original: S = downcast_instance(key, &instance)?;
            Ok(Arc::new(decorator(original, resolver)?) as Instance)
        });

        debug!(key = %key, lifetime = %lifetime, inherited = inner.is_none(), "Decorating service");
        self.insert(Registration::new(key, lifetime, ProducerKind::Decorator { inner, decorate }));
        Ok(self)
    }

    /// Add a [`Provider`] module to this level.
    ///
    /// # Errors
    /// The first registration error the provider produced. Nothing the
    /// provider registered is kept in that case.
    pub fn add_provider(&self, provider: &dyn Provider) -> Result<&Self> {
        debug!(provider = provider.name(), "Adding provider");
        let mut sink = LevelSink::default();
        provider.register(&mut sink);

        if let Some(err) = sink.errors.into_iter().next() {
            debug!(provider = provider.name(), error = %err, "Provider rejected");
            return Err(err);
        }
        for registration in sink.registrations {
            self.insert(registration);
        }
        Ok(self)
    }

    fn insert(&self, registration: Registration) {
        self.level.registry.insert(registration);
    }

    // ── Forks and scopes ──

    /// Create a fork of this container.
    ///
    /// The fork starts with no registrations of its own and resolves
    /// everything it lacks from this container. Registering on the fork
    /// never changes what this container resolves.
    pub fn customize(&self) -> Container {
        let depth = self.level.depth + 1;
        debug!(depth, "Customizing container");
        Self::from_level(Level {
            registry: Registry::new(),
            parent: Some(self.clone()),
            depth,
        })
    }

    /// Create an explicit resolution scope.
    ///
    /// `PerScope` services resolved through the scope are shared until the
    /// scope is dropped.
    pub fn create_scope(&self) -> Scope {
        debug!(depth = self.level.depth, "Creating new scope");
        Scope::new(self.clone())
    }

    /// Resolve a service by type.
    ///
    /// Each call opens a fresh implicit scope that every nested resolve
    /// of the call shares.
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.resolve()?;
    /// ```
    pub fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        self.create_scope().resolve()
    }

    // ── Introspection ──

    /// Returns `true` if this level or any ancestor registers `T`.
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.find_registration(&DependencyKey::of::<T>()).is_some()
    }

    /// Number of ancestors; zero for a root container.
    pub fn depth(&self) -> usize {
        self.level.depth
    }

    /// Number of registrations made at this level.
    pub fn local_len(&self) -> usize {
        self.level.registry.len()
    }

    /// Returns `true` if both handles refer to the same level.
    pub fn ptr_eq(a: &Container, b: &Container) -> bool {
        Arc::ptr_eq(&a.level, &b.level)
    }

    /// The container this one was forked from.
    pub(crate) fn parent(&self) -> Option<&Container> {
        self.level.parent.as_ref()
    }

    /// Containers from this one up to the root.
    fn levels(&self) -> impl Iterator<Item = &Container> {
        std::iter::successors(Some(self), |container| container.parent())
    }

    /// Finds the nearest registration of `key`, walking up the fork chain.
    ///
    /// Returns the level that owns it along with the registration.
    pub(crate) fn find_registration(
        &self,
        key: &DependencyKey,
    ) -> Option<(Container, Arc<Registration>)> {
        self.levels().find_map(|container| {
            let found = container.level.registry.get(key)?;
            trace!(key = %key, depth = container.depth(), "Found registration");
            Some((container.clone(), found))
        })
    }

    /// Registered keys whose names resemble `key`, across all levels.
    pub(crate) fn suggestions_for(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        let mut seen = HashSet::new();
        let keys: Vec<DependencyKey> = self
            .levels()
            .flat_map(|container| container.level.registry.keys())
            .filter(|k| k != key && seen.insert(*k))
            .collect();

        suggest_similar(key.type_name(), keys.iter().map(|k| k.type_name()), MAX_SUGGESTIONS)
            .into_iter()
            .filter_map(|name| keys.iter().find(|k| k.type_name() == name).copied())
            .collect()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("depth", &self.level.depth)
            .field("registered", &self.level.registry.len())
            .field("singletons", &self.level.registry.cached_singletons())
            .finish()
    }
}

/// Buffers provider registrations until the provider finishes cleanly.
#[derive(Default)]
struct LevelSink {
    registrations: Vec<Registration>,
    errors: Vec<StratumError>,
}

impl ProviderRegistry for LevelSink {
    fn register_producer(&mut self, key: DependencyKey, lifetime: Lifetime, producer: Producer) {
        self.registrations
            .push(Registration::factory(key, lifetime, producer));
    }

    fn record_error(&mut self, error: StratumError) {
        self.errors.push(error);
    }
}

// ═══════════════════════════════════════════
// Free function for use inside factories
// ═══════════════════════════════════════════

/// Resolve a typed dependency from a [`Resolver`].
///
/// Equivalent to [`ResolverApi::resolve`](crate::registry::ResolverApi::resolve)
/// for callers that prefer a function:
///
/// ```rust,ignore
/// container.register_with::<MyService>(|r| {
///     let db: Arc<Database> = stratum_container::container::resolve(r)?;
///     Ok(MyService { db })
/// }, Lifetime::Transient);
/// ```
pub fn resolve<T: Clone + Send + Sync + 'static>(resolver: &dyn Resolver) -> Result<T> {
    let key = DependencyKey::of::<T>();
    let instance = resolver.resolve_key(&key)?;
    downcast_instance(key, &instance)
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, resolve};
    pub use crate::constructor::{Constructor, Injectable};
    pub use crate::error::{Result, StratumError};
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::registry::{Resolver, ResolverApi};
    pub use crate::scope::Scope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
