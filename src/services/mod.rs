//! Lifecycle services: configuration resolution, classification, action
//! application, sweeping, trigger routing and repository scheduling.

pub mod config_resolver;
pub mod event_router;
pub mod lifecycle_engine;
pub mod marker_classifier;
pub mod repo_scheduler;
pub mod sweep_coordinator;

pub use config_resolver::ConfigResolver;
pub use event_router::{EventRouter, RouteOutcome, RouterSettings, RoutingDecision};
pub use lifecycle_engine::{ActionOutcome, LifecycleEngine};
pub use repo_scheduler::RepoScheduler;
pub use sweep_coordinator::SweepCoordinator;
