//! # Stratum Support
//!
//! Shared utilities for the Stratum DI crates.
//!
//! This crate provides:
//! - Text rendering for diagnostics (dependency chains, short type names)
//! - "Did you mean?" suggestions for unregistered services

pub mod rendering;
