//! Resolution scopes.
//!
//! A [`Scope`] is one resolution context: it owns the cache of
//! [`PerScope`](crate::lifetime::Lifetime::PerScope) instances and
//! performs the lifetime dispatch for every resolve made through it.
//!
//! ```text
//! Container::resolve()  ──>  implicit Scope (dropped when the call returns)
//! Container::create_scope()  ──>  explicit Scope (dropped by the caller)
//!                                   │
//!                          producer(&ScopeResolver)
//!                                   │
//!                          nested resolves reuse the same Scope
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::container::Container;
use crate::error::{NotRegisteredError, Result, StratumError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::{
    Instance, ProducerKind, Registration, RegistrationId, Resolver, downcast_instance,
};

/// A resolution context with its own per-scope instance cache.
///
/// Created by [`Container::create_scope`]. Every resolve made through the
/// same scope, including the nested resolves performed by producers,
/// shares its `PerScope` instances. Dropping the scope releases them.
///
/// # Examples
/// ```rust,ignore
/// let scope = container.create_scope();
/// let a: Arc<UnitOfWork> = scope.resolve()?;
/// let b: Arc<UnitOfWork> = scope.resolve()?;
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub struct Scope {
    container: Container,
    instances: Mutex<HashMap<RegistrationId, Instance>>,
}

impl Scope {
    pub(crate) fn new(container: Container) -> Self {
        Self {
            container,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a service within this scope.
    ///
    /// # Errors
    /// - [`StratumError::NotRegistered`] if no container level registers
    ///   the type, or one of its dependencies
    /// - whatever a producer in the graph returns
    pub fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        let key = DependencyKey::of::<T>();
        let instance = self.resolve_in(&key, None)?;
        downcast_instance(key, &instance)
    }

    /// The container this scope resolves from.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Number of per-scope instances created so far.
    pub fn cached_len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Looks up `key` along the fork chain and produces an instance.
    fn resolve_in(&self, key: &DependencyKey, parent: Option<&Frame<'_>>) -> Result<Instance> {
        trace!(key = %key, depth = Frame::depth(parent), "Resolving");

        let (owner, registration) = self
            .container
            .find_registration(key)
            .ok_or_else(|| self.not_registered(*key, parent))?;

        let frame = Frame { key: *key, parent };
        self.produce(&owner, &registration, &frame)
    }

    /// Applies the registration's lifetime policy.
    ///
    /// `owner` is the level that holds `registration`. Singletons are built
    /// against it, so a fork's overrides never leak into an instance its
    /// ancestors share.
    fn produce(
        &self,
        owner: &Container,
        registration: &Arc<Registration>,
        frame: &Frame<'_>,
    ) -> Result<Instance> {
        match registration.lifetime {
            Lifetime::Transient => self.invoke(owner, registration, frame),
            Lifetime::Singleton => registration.singleton_or_try_init(|| {
                debug!(key = %registration.key, depth = owner.depth(), "Constructing singleton");
                if Container::ptr_eq(owner, &self.container) {
                    self.invoke(owner, registration, frame)
                } else {
                    Scope::new(owner.clone()).invoke(owner, registration, frame)
                }
            }),
            Lifetime::PerScope => {
                let cached = self.instances.lock().get(&registration.id).cloned();
                if let Some(instance) = cached {
                    trace!(key = %registration.key, "Reusing scoped instance");
                    return Ok(instance);
                }

                let instance = self.invoke(owner, registration, frame)?;
                let mut instances = self.instances.lock();
                Ok(Arc::clone(instances.entry(registration.id).or_insert(instance)))
            }
        }
    }

    /// Runs the producer with a resolver bound to this scope.
    fn invoke(
        &self,
        owner: &Container,
        registration: &Registration,
        frame: &Frame<'_>,
    ) -> Result<Instance> {
        let resolver = ScopeResolver { scope: self, frame };
        match &registration.producer {
            ProducerKind::Factory(producer) => producer(&resolver),
            ProducerKind::Decorator { inner, decorate } => {
                let original = match inner {
                    Some(inner) => self.produce(owner, inner, frame)?,
                    None => {
                        let (inner_owner, inner) = owner
                            .parent()
                            .and_then(|parent| parent.find_registration(&registration.key))
                            .ok_or_else(|| self.not_registered(registration.key, frame.parent))?;
                        self.produce(&inner_owner, &inner, frame)?
                    }
                };
                decorate(original, &resolver)
            }
        }
    }

    fn not_registered(&self, requested: DependencyKey, parent: Option<&Frame<'_>>) -> StratumError {
        debug!(key = %requested, "Service not registered");
        StratumError::NotRegistered(NotRegisteredError {
            requested,
            required_by: parent.map(Frame::chain).unwrap_or_default(),
            suggestions: self.container.suggestions_for(&requested),
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("container", &self.container)
            .field("cached", &self.cached_len())
            .finish()
    }
}

/// One step of the resolution path, linked to the service that asked for it.
struct Frame<'a> {
    key: DependencyKey,
    parent: Option<&'a Frame<'a>>,
}

impl Frame<'_> {
    /// Keys from the outermost request down to this frame.
    fn chain(&self) -> Vec<DependencyKey> {
        let mut keys = vec![self.key];
        let mut current = self.parent;
        while let Some(frame) = current {
            keys.push(frame.key);
            current = frame.parent;
        }
        keys.reverse();
        keys
    }

    fn depth(frame: Option<&Frame<'_>>) -> usize {
        frame.map_or(0, |f| f.chain().len())
    }
}

/// The facade handed to producers: resolves through the active scope
/// and records who asked.
struct ScopeResolver<'a> {
    scope: &'a Scope,
    frame: &'a Frame<'a>,
}

impl Resolver for ScopeResolver<'_> {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.scope.resolve_in(key, Some(self.frame))
    }
}
