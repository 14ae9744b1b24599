//! Service lifetimes.
//!
//! A lifetime decides how long a resolved instance is reused:
//! - [`Lifetime::Transient`]: new instance on every resolve
//! - [`Lifetime::Singleton`]: one instance per owning container level
//! - [`Lifetime::PerScope`]: one instance per resolution scope
//!
//! Lifetimes can be read from configuration: they implement [`FromStr`]
//! and serde's `Serialize`/`Deserialize` using snake_case names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Defines how instances of a registration are reused.
///
/// # Examples
/// ```
/// use stratum_container::lifetime::Lifetime;
///
/// let lifetime: Lifetime = "per_scope".parse().unwrap();
/// assert_eq!(lifetime, Lifetime::PerScope);
/// assert!(lifetime.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// New instance created on every resolve call.
    ///
    /// Never cached, not even within one resolution graph.
    Transient,

    /// One instance shared by every resolve that reaches the same
    /// registration.
    ///
    /// Created on first resolve and kept by the container level that
    /// owns the registration. Forks that inherit the registration share
    /// the instance; forks that override it get their own. Dependencies
    /// are resolved from the owning level, never from the fork that
    /// happened to ask first.
    Singleton,

    /// One instance per resolution scope.
    ///
    /// A top-level `resolve` on a container opens an implicit scope that
    /// lasts for that call; an explicit [`Scope`](crate::scope::Scope)
    /// keeps its instances until it is dropped.
    PerScope,
}

impl Lifetime {
    /// Returns `true` if instances of this lifetime are reused.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::PerScope)
    }

    /// Returns the snake_case name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::PerScope => "per_scope",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Transient => write!(f, "Transient"),
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::PerScope => write!(f, "PerScope"),
        }
    }
}

/// Returned when a string does not name a [`Lifetime`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown lifetime {input:?}: expected one of \"transient\", \"singleton\", \"per_scope\"")]
pub struct ParseLifetimeError {
    pub input: String,
}

impl FromStr for Lifetime {
    type Err = ParseLifetimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "per_scope" | "perscope" | "scoped" => Ok(Lifetime::PerScope),
            _ => Err(ParseLifetimeError { input: s.to_string() }),
        }
    }
}
