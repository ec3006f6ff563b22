//! GitHub HTTP client with rate limiting and retries.
//!
//! Wraps the GitHub REST API v3 with typed methods for the calls the stale
//! lifecycle needs. Every request first takes a token from a shared
//! token-bucket limiter (5 000 req/hour for authenticated callers by
//! default) and transient failures are retried with exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::error::GitHubError;
use super::models::{
    GitHubCommentRequest, GitHubContent, GitHubIssue, GitHubIssueEvent, GitHubIssueUpdateRequest,
    GitHubLabelsRequest, GitHubSearchResponse,
};
use super::retry::RetryPolicy;
use crate::domain::models::Config;

/// Base URL for the GitHub REST API v3.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
/// The search API never returns more than 1 000 results.
const MAX_SEARCH_PAGES: u32 = 10;
const MAX_EVENT_PAGES: u32 = 10;

/// Token-bucket rate limiter.
///
/// Allows up to `capacity` requests per `window`. When the bucket is
/// exhausted, [`acquire`](RateLimiter::acquire) sleeps until the window
/// resets.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    tokens: u32,
    window: Duration,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            window,
            window_start: Instant::now(),
        }
    }

    pub fn per_hour(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(3_600))
    }

    pub const fn remaining(&self) -> u32 {
        self.tokens
    }

    /// Take one token, sleeping until the window resets when none is left.
    pub async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.tokens = self.capacity;
            self.window_start = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
        } else {
            let remaining = self.window.saturating_sub(elapsed);
            tracing::warn!(
                sleep_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                "GitHub rate limit budget exhausted, sleeping"
            );
            tokio::time::sleep(remaining).await;
            self.tokens = self.capacity - 1;
            self.window_start = Instant::now();
        }
    }
}

/// HTTP client for the GitHub REST API v3.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
    user_agent: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: GITHUB_API_BASE.to_string(),
            token: token.into(),
            user_agent: "stalebot".to_string(),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::per_hour(5_000))),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from application configuration, reading the token from
    /// the configured environment variable.
    pub fn from_config(config: &Config) -> Result<Self, GitHubError> {
        let var = &config.github.token_env;
        let token = std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GitHubError::Rejected {
                status: 401,
                body: format!("{var} environment variable is not set"),
            })?;

        Ok(Self::new(token)
            .with_base_url(&config.github.api_base)?
            .with_user_agent(&config.github.user_agent)
            .with_rate_limit(config.rate_limit.requests_per_hour)
            .with_retry_policy(RetryPolicy::from(&config.retry)))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GitHubError> {
        Url::parse(base_url).map_err(|e| GitHubError::InvalidUrl(format!("{base_url}: {e}")))?;
        self.base_url = base_url.to_string();
        Ok(self)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_hour: u32) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::per_hour(requests_per_hour)));
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL for the given path segments; each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, GitHubError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| GitHubError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| GitHubError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_url(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, GitHubError> {
        let mut segments = vec!["repos", owner, repo];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    /// Send one request with rate limiting and retries.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, GitHubError> {
        self.retry
            .execute(|| {
                let method = method.clone();
                let url = url.clone();
                async move {
                    self.rate_limiter.lock().await.acquire().await;
                    let mut request = self
                        .http
                        .request(method, url)
                        .header("Authorization", format!("Bearer {}", self.token))
                        .header("Accept", "application/vnd.github+json")
                        .header("X-GitHub-Api-Version", "2022-11-28")
                        .header("User-Agent", &self.user_agent);
                    if let Some(body) = body {
                        request = request.json(body);
                    }
                    let response = request.send().await?;
                    check_status(response).await
                }
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GitHubError> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// `GET /repos/{owner}/{repo}/issues/{number}`.
    pub async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<GitHubIssue, GitHubError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number])?;
        self.get_json(url).await
    }

    /// Run an issue search, following pagination up to the API's cap.
    pub async fn search_issues(&self, query: &str) -> Result<Vec<GitHubIssue>, GitHubError> {
        let mut items = Vec::new();

        for page in 1..=MAX_SEARCH_PAGES {
            let mut url = self.url(&["search", "issues"])?;
            url.query_pairs_mut()
                .append_pair("q", query)
                .append_pair("sort", "updated")
                .append_pair("order", "asc")
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let response: GitHubSearchResponse = self.get_json(url).await?;
            if response.incomplete_results {
                tracing::debug!(query, page, "GitHub search returned incomplete results");
            }
            let fetched = response.items.len();
            items.extend(response.items);
            if fetched < PER_PAGE || items.len() as u64 >= response.total_count {
                break;
            }
        }

        Ok(items)
    }

    /// `POST /repos/{owner}/{repo}/issues/{number}/labels`.
    pub async fn add_labels(&self, owner: &str, repo: &str, number: u64, labels: &[String]) -> Result<(), GitHubError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number, "labels"])?;
        let body = GitHubLabelsRequest {
            labels: labels.to_vec(),
        };
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    /// `DELETE /repos/{owner}/{repo}/issues/{number}/labels/{name}`.
    /// A label that is not on the item is not an error.
    pub async fn remove_label(&self, owner: &str, repo: &str, number: u64, label: &str) -> Result<(), GitHubError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number, "labels", label])?;
        match self.send::<()>(Method::DELETE, url, None).await {
            Ok(_) | Err(GitHubError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `POST /repos/{owner}/{repo}/issues/{number}/comments`.
    pub async fn post_comment(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<(), GitHubError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number, "comments"])?;
        let body = GitHubCommentRequest {
            body: body.to_string(),
        };
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    /// `PATCH /repos/{owner}/{repo}/issues/{number}` with a new state.
    pub async fn update_issue_state(&self, owner: &str, repo: &str, number: u64, state: &str) -> Result<(), GitHubError> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["issues", &number])?;
        let body = GitHubIssueUpdateRequest {
            state: state.to_string(),
        };
        self.send(Method::PATCH, url, Some(&body)).await?;
        Ok(())
    }

    /// Decoded content of a file on the default branch; `None` when absent.
    pub async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>, GitHubError> {
        let mut rest = vec!["contents"];
        rest.extend(path.split('/').filter(|s| !s.is_empty()));
        let url = self.repo_url(owner, repo, &rest)?;

        let content: GitHubContent = match self.get_json(url).await {
            Ok(content) => content,
            Err(GitHubError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        match (content.encoding.as_deref(), content.content) {
            (Some("base64") | None, Some(encoded)) => decode_base64(&encoded).map(Some),
            (Some(other), _) => Err(GitHubError::Decode(format!("unsupported content encoding '{other}'"))),
            (None, None) => Ok(None),
        }
    }

    /// Timeline of label and state events on an item, oldest first.
    pub async fn list_issue_events(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<GitHubIssueEvent>, GitHubError> {
        let number = number.to_string();
        let mut events = Vec::new();

        for page in 1..=MAX_EVENT_PAGES {
            let mut url = self.repo_url(owner, repo, &["issues", &number, "events"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<GitHubIssueEvent> = self.get_json(url).await?;
            let fetched = batch.len();
            events.extend(batch);
            if fetched < PER_PAGE {
                break;
            }
        }

        Ok(events)
    }
}

/// Contents API payloads wrap base64 at 60 columns.
fn decode_base64(encoded: &str) -> Result<String, GitHubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GitHubError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| GitHubError::Decode(format!("content is not UTF-8: {e}")))
}

/// Seconds to wait before retrying, from `Retry-After` or the rate-limit reset.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    if header("x-ratelimit-remaining") == Some("0") {
        let reset = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok())?;
        let wait = reset - chrono::Utc::now().timestamp();
        return Some(Duration::from_secs(u64::try_from(wait.max(0)).unwrap_or(0)));
    }
    None
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let wait = retry_after(response.headers());
    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => Err(GitHubError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(GitHubError::RateLimited {
            retry_after: wait.unwrap_or(Duration::from_secs(60)),
        }),
        StatusCode::FORBIDDEN if wait.is_some() || body.to_lowercase().contains("rate limit") => {
            Err(GitHubError::RateLimited {
                retry_after: wait.unwrap_or(Duration::from_secs(60)),
            })
        }
        s if s.is_server_error() => Err(GitHubError::Server { status: code, body }),
        _ => Err(GitHubError::Rejected { status: code, body }),
    }
}
