//! Domain layer for the stale lifecycle system
//!
//! This module contains the domain models, error types and the port traits
//! that infrastructure adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
