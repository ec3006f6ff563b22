use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::RepoId;

/// Directory holding the project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".stalebot";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid repository '{0}'. Expected owner/name")]
    InvalidRepository(String),

    #[error("Invalid requests_per_hour: {0}. Must be at least 1")]
    InvalidRateLimit(u32),

    #[error("Invalid max_concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid {0}: must be at least 1")]
    ZeroSetting(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `.stalebot/` in the working directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .stalebot/config.yaml
    /// 3. .stalebot/local.yaml (optional overrides)
    /// 4. Environment variables (`STALEBOT_*`, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same layering as [`ConfigLoader::load`] rooted at another directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("STALEBOT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment variables still win.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("STALEBOT_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for repo in &config.repositories {
            RepoId::parse(repo).map_err(|_| ConfigError::InvalidRepository(repo.clone()))?;
        }

        if config.github.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "github.api_base cannot be empty".to_string(),
            ));
        }
        if config.github.token_env.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "github.token_env cannot be empty".to_string(),
            ));
        }

        if config.scheduler.tick_interval_secs == 0 {
            return Err(ConfigError::ZeroSetting("scheduler.tick_interval_secs"));
        }
        if config.scheduler.visit_interval_secs == 0 {
            return Err(ConfigError::ZeroSetting("scheduler.visit_interval_secs"));
        }
        if config.scheduler.max_consecutive_failures == 0 {
            return Err(ConfigError::ZeroSetting("scheduler.max_consecutive_failures"));
        }

        if config.sweep.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.sweep.max_concurrency));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.rate_limit.requests_per_hour == 0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_hour));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}
