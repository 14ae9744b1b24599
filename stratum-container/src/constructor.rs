//! Constructor registration.
//!
//! A type becomes auto-constructible by implementing [`Injectable`] and
//! listing its constructors. Each [`Constructor`] wraps a plain function
//! whose argument types are its dependencies:
//!
//! ```rust,ignore
//! struct OrderService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for OrderService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|db: Arc<Database>| OrderService { db })]
//!     }
//! }
//! ```
//!
//! [`Container::register`](crate::container::Container::register) accepts a
//! type only if it lists exactly one constructor. Types with several ways
//! to be built are registered through a factory instead.

use std::fmt;
use std::sync::Arc;

use crate::error::{InvalidRegistrationError, Result, StratumError};
use crate::key::DependencyKey;
use crate::registry::{Instance, Producer, Resolver, ResolverApi};

/// A type the container can build from its declared constructors.
///
/// `#[derive(Injectable)]` generates a single constructor that resolves
/// every field by type.
pub trait Injectable: Sized + 'static {
    /// The constructors this type exposes to the container.
    fn constructors() -> Vec<Constructor<Self>>;
}

/// One way of building a `T` from resolved dependencies.
pub struct Constructor<T> {
    parameters: Vec<DependencyKey>,
    invoke: Arc<dyn Fn(&dyn Resolver) -> Result<T> + Send + Sync>,
}

impl<T: 'static> Constructor<T> {
    /// Wraps a function whose argument types are resolved from the
    /// container on every call.
    pub fn new<Args, F>(function: F) -> Self
    where
        F: ConstructorFn<Args, Output = T>,
    {
        Self {
            parameters: F::parameters(),
            invoke: Arc::new(move |resolver: &dyn Resolver| function.call(resolver)),
        }
    }

    /// Wraps a function that resolves its own dependencies.
    ///
    /// The parameter list is informational only.
    pub fn with_resolver<F>(parameters: Vec<DependencyKey>, function: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            parameters,
            invoke: Arc::new(function),
        }
    }

    /// The dependency keys this constructor resolves, in argument order.
    pub fn parameters(&self) -> &[DependencyKey] {
        &self.parameters
    }

    /// Resolves the arguments and invokes the constructor.
    pub fn construct(&self, resolver: &dyn Resolver) -> Result<T> {
        (self.invoke)(resolver)
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
            invoke: Arc::clone(&self.invoke),
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A function usable as a [`Constructor`].
///
/// Implemented for every `Fn(A1, .., An) -> T` with up to twelve
/// arguments, where each argument is a resolvable service.
pub trait ConstructorFn<Args>: Send + Sync + 'static {
    type Output;

    /// Keys of the argument types, in order.
    fn parameters() -> Vec<DependencyKey>;

    /// Resolves every argument and calls the function.
    fn call(&self, resolver: &dyn Resolver) -> Result<Self::Output>;
}

impl<F, O> ConstructorFn<()> for F
where
    F: Fn() -> O + Send + Sync + 'static,
{
    type Output = O;

    fn parameters() -> Vec<DependencyKey> {
        Vec::new()
    }

    fn call(&self, _resolver: &dyn Resolver) -> Result<O> {
        Ok(self())
    }
}

macro_rules! impl_constructor_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        impl<F, O, $($ty,)*> ConstructorFn<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> O + Send + Sync + 'static,
            $($ty: Clone + Send + Sync + 'static,)*
        {
            type Output = O;

            fn parameters() -> Vec<DependencyKey> {
                vec![$(DependencyKey::of::<$ty>(),)*]
            }

            fn call(&self, resolver: &dyn Resolver) -> Result<O> {
                $(let $ty: $ty = resolver.resolve()?;)*
                Ok(self($($ty,)*))
            }
        }
    };
}

impl_constructor_fn!(T1);
impl_constructor_fn!(T1, T2);
impl_constructor_fn!(T1, T2, T3);
impl_constructor_fn!(T1, T2, T3, T4);
impl_constructor_fn!(T1, T2, T3, T4, T5);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_constructor_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

/// Builds the producer for registering `I` under the service key `S`.
///
/// # Errors
/// Returns [`StratumError::InvalidRegistration`] unless `I` declares
/// exactly one constructor.
pub(crate) fn single_constructor_producer<S, I>() -> Result<Producer>
where
    S: From<I> + Send + Sync + 'static,
    I: Injectable,
{
    let constructor = match <[Constructor<I>; 1]>::try_from(I::constructors()) {
        Ok([constructor]) => constructor,
        Err(found) => {
            return Err(StratumError::InvalidRegistration(InvalidRegistrationError {
                service: DependencyKey::of::<S>(),
                implementation: DependencyKey::of::<I>(),
                constructors: found.len(),
            }));
        }
    };

    Ok(Arc::new(move |resolver: &dyn Resolver| {
        let value = constructor.construct(resolver)?;
        Ok(Arc::new(S::from(value)) as Instance)
    }))
}
