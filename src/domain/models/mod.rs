//! Domain models: repositories, tracked items, configuration, schedule
//! entries, triggers and lifecycle verdicts.

pub mod config;
pub mod item;
pub mod lifecycle;
pub mod repository;
pub mod schedule;
pub mod stale_config;
pub mod trigger;

pub use config::{
    Config, GitHubConfig, LoggingConfig, RateLimitConfig, RetryConfig, SchedulerConfig,
    SweepConfig,
};
pub use item::{ItemKind, ItemState, TrackedItem};
pub use lifecycle::{LifecycleAction, SweepPhase, SweepReport, Verdict};
pub use repository::RepoId;
pub use schedule::ScheduleEntry;
pub use stale_config::{
    CloseAgeBasis, OnlyKind, RepositoryConfig, StaleConfigDocument, Switch, CONFIG_PATH,
};
pub use trigger::{ActivityEvent, ActivityKind, Actor, Trigger};
