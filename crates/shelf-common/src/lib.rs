//! # shelf-common
//!
//! Configuration and error handling shared by every Shelf crate.
//! This is the foundation layer: no filesystem or routing logic, just primitives and contracts.

pub mod config;
pub mod error;
