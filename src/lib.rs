//! Stalebot - stale issue and pull request lifecycle bot
//!
//! Marks inactive issues and pull requests with a stale label, removes the
//! label when activity resumes, and closes items that stay stale. Each
//! repository governs itself through a `.github/stale.yml` document.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Service Layer** (`services`): classification, planning, sweeps,
//!   routing and scheduling
//! - **Adapters** (`adapters`): GitHub REST API and in-memory implementations
//!   of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stalebot::adapters::memory::{InMemoryPlatform, InMemoryScheduleStore};
//! use stalebot::domain::models::{RepoId, Trigger};
//! use stalebot::domain::ports::SystemClock;
//! use stalebot::services::{EventRouter, RouterSettings};
//!
//! # async fn demo() {
//! let router = EventRouter::new(
//!     Arc::new(InMemoryPlatform::new()),
//!     Arc::new(InMemoryScheduleStore::new()),
//!     Arc::new(SystemClock),
//!     RouterSettings::default(),
//! );
//! let outcome = router.handle(Trigger::Sweep { repo: RepoId::new("octo", "widgets") }).await;
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ActivityEvent, Config, ItemKind, RepoId, RepositoryConfig, SweepReport, TrackedItem, Trigger, Verdict,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventRouter, RouteOutcome, RouterSettings};
