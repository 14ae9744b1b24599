//! Derive macros for Stratum.
//!
//! ```rust,ignore
//! use stratum::prelude::*;
//!
//! #[derive(Clone, Injectable)]
//! struct OrderService {
//!     db: Arc<Database>,
//! }
//!
//! container.register::<OrderService, OrderService>(Lifetime::Transient)?;
//! ```

pub use stratum_macros::Injectable;
