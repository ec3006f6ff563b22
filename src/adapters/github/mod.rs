//! GitHub adapter.
//!
//! Implements [`IssuePlatform`](crate::domain::ports::IssuePlatform) over
//! the GitHub REST API v3 and parses webhook deliveries into activity
//! events.

pub mod client;
pub mod error;
pub mod models;
pub mod platform;
pub mod retry;
pub mod webhook;

pub use client::{GitHubClient, RateLimiter};
pub use error::GitHubError;
pub use platform::GitHubPlatform;
pub use retry::RetryPolicy;
pub use webhook::parse_webhook;
