//! # Stratum: a small layered dependency injection container
//!
//! Register services with a [`Lifetime`], resolve whole object graphs, and
//! fork the container with [`Container::customize`] to override a few
//! services without touching the original.
//!
//! ```rust
//! use std::sync::Arc;
//! use stratum::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Injectable)]
//! struct SystemClock;
//!
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 1_700_000_000 }
//! }
//!
//! impl From<SystemClock> for Arc<dyn Clock> {
//!     fn from(clock: SystemClock) -> Self { Arc::new(clock) }
//! }
//!
//! #[derive(Injectable)]
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//! }
//!
//! # fn main() -> stratum::Result<()> {
//! let container = Container::new();
//! container
//!     .register::<Arc<dyn Clock>, SystemClock>(Lifetime::Singleton)?
//!     .register::<Arc<Scheduler>, Scheduler>(Lifetime::Transient)?;
//!
//! let scheduler: Arc<Scheduler> = container.resolve()?;
//! assert_eq!(scheduler.clock.now(), 1_700_000_000);
//! # Ok(())
//! # }
//! ```

extern crate self as stratum;

pub use stratum_container::*;
pub use stratum_derive::Injectable;
pub use stratum_support::*;

/// Everything needed to register and resolve services.
pub mod prelude {
    pub use stratum_container::prelude::*;
    pub use stratum_derive::Injectable;
}

#[cfg(test)]
mod acceptance;
