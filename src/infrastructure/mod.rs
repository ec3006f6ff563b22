//! Infrastructure layer module
//!
//! Process-wide concerns that sit outside the domain:
//! - Configuration loading and validation (figment)
//! - Logging setup (tracing-subscriber, tracing-appender)

pub mod config;
pub mod logging;
