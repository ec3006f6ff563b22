//! In-memory adapters for tests and local runs.

pub mod platform;
pub mod schedule_store;

pub use platform::{InMemoryPlatform, Mutation};
pub use schedule_store::InMemoryScheduleStore;
