//! Service registry: stores the registrations of one container level.
//!
//! The registry maps a [`DependencyKey`] to the [`Registration`] that
//! knows how to produce instances of it. Every container level (the root
//! and each fork) owns exactly one registry.

use std::any::{Any, type_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{Result, StratumError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// A type-erased resolved instance.
///
/// Cached instances are shared between resolves; typed callers receive a
/// clone of the value stored inside.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type alias for producer functions.
///
/// A producer takes the active [`Resolver`] (to resolve sub-dependencies
/// from the same scope) and returns a new instance or an error.
pub type Producer = Arc<dyn Fn(&dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Wraps an instance produced by an earlier registration.
pub(crate) type DecoratorFn = Arc<dyn Fn(Instance, &dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Resolves services from the scope that is currently active.
///
/// This is what producers and factories receive. Use [`ResolverApi`]
/// for the typed form.
pub trait Resolver: Send + Sync {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance>;
}

/// Typed resolution on top of any [`Resolver`].
///
/// ```rust,ignore
/// container.register_with::<OrderService>(|r| {
///     let db: Arc<Database> = r.resolve()?;
///     Ok(OrderService { db })
/// }, Lifetime::Transient);
/// ```
pub trait ResolverApi {
    fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T>;
}

impl<R: Resolver + ?Sized> ResolverApi for R {
    fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        let key = DependencyKey::of::<T>();
        let instance = self.resolve_key(&key)?;
        downcast_instance(key, &instance)
    }
}

/// Clones the `T` stored in a type-erased instance.
pub(crate) fn downcast_instance<T: Clone + 'static>(
    key: DependencyKey,
    instance: &Instance,
) -> Result<T> {
    (**instance)
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| StratumError::ConstructionFailed {
            key,
            source: format!("Type mismatch: expected {}", type_name::<T>()).into(),
        })
}

/// Builds a producer from a typed factory.
pub(crate) fn factory_producer<T, F>(factory: F) -> Producer
where
    T: Send + Sync + 'static,
    F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &dyn Resolver| Ok(Arc::new(factory(resolver)?) as Instance))
}

/// Builds a producer that hands out clones of a pre-built value.
pub(crate) fn value_producer<T: Clone + Send + Sync + 'static>(value: T) -> Producer {
    Arc::new(move |_: &dyn Resolver| Ok(Arc::new(value.clone()) as Instance))
}

/// Unique identity of a registration; keys the per-scope caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RegistrationId(u64);

impl RegistrationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistrationId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a registration produces its instances.
#[derive(Clone)]
pub(crate) enum ProducerKind {
    /// Call the producer directly.
    Factory(Producer),
    /// Produce the wrapped service, then pass the result through `decorate`.
    ///
    /// `inner` is set when the decorator replaced a registration of its own
    /// level. Otherwise the wrapped registration is looked up above the
    /// decorating level on every produce, so later ancestor registrations
    /// are picked up.
    Decorator {
        inner: Option<Arc<Registration>>,
        decorate: DecoratorFn,
    },
}

/// Registration entry for a single service at one level.
///
/// Immutable once stored. The singleton cell lives here, so a
/// registration that is replaced takes its cached instance with it.
pub(crate) struct Registration {
    pub id: RegistrationId,
    pub key: DependencyKey,
    pub lifetime: Lifetime,
    pub producer: ProducerKind,
    singleton: OnceCell<Instance>,
}

impl Registration {
    pub fn new(key: DependencyKey, lifetime: Lifetime, producer: ProducerKind) -> Self {
        Self {
            id: RegistrationId::next(),
            key,
            lifetime,
            producer,
            singleton: OnceCell::new(),
        }
    }

    pub fn factory(key: DependencyKey, lifetime: Lifetime, producer: Producer) -> Self {
        Self::new(key, lifetime, ProducerKind::Factory(producer))
    }

    /// Returns the singleton instance, running `init` at most once.
    pub fn singleton_or_try_init(
        &self,
        init: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        self.singleton.get_or_try_init(init).cloned()
    }

    /// Returns `true` if the singleton instance has been created.
    pub fn has_singleton(&self) -> bool {
        self.singleton.get().is_some()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("decorated", &matches!(self.producer, ProducerKind::Decorator { .. }))
            .finish()
    }
}

/// Stores the registrations of one container level.
///
/// Lookups hand out `Arc` clones, so no map lock is held while a
/// producer runs.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: DashMap<DependencyKey, Arc<Registration>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a registration, replacing any previous one for the same key.
    ///
    /// Returns the replaced registration, if any.
    pub fn insert(&self, registration: Registration) -> Option<Arc<Registration>> {
        let key = registration.key;
        let lifetime = registration.lifetime;
        let replaced = self.registrations.insert(key, Arc::new(registration));

        debug!(
            key = %key,
            lifetime = %lifetime,
            replaced = replaced.is_some(),
            "Registered service"
        );
        replaced
    }

    /// Looks up the registration for `key` at this level only.
    pub fn get(&self, key: &DependencyKey) -> Option<Arc<Registration>> {
        self.registrations.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns the keys registered at this level.
    pub fn keys(&self) -> Vec<DependencyKey> {
        self.registrations.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns how many singleton registrations hold a built instance.
    pub fn cached_singletons(&self) -> usize {
        self.registrations
            .iter()
            .filter(|entry| entry.value().has_singleton())
            .count()
    }
}
