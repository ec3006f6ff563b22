//! CLI command implementations.

pub mod config;
pub mod event;
pub mod run;
pub mod sweep;
