//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters must implement:
//! - IssuePlatform: issue/pull request hosting platform operations
//! - ScheduleStore: repository visitation schedule
//! - Clock: current time
//!
//! These traits keep the lifecycle engine independent of the hosting
//! platform and of how the schedule is stored.

pub mod clock;
pub mod issue_platform;
pub mod schedule_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use issue_platform::{IssuePlatform, ItemQuery};
pub use schedule_store::ScheduleStore;
