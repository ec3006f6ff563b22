//! Errors raised by the GitHub HTTP client.

use std::time::Duration;

use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("request rejected with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("not found")]
    NotFound,

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl GitHubError {
    /// Whether retrying the same request may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited { .. } | Self::Server { .. }
        )
    }
}

impl From<GitHubError> for DomainError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            other => Self::ExecutionFailed(format!("GitHub {other}")),
        }
    }
}
