//! Configuration management for TaskTune.
//!
//! Configuration is read from environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `TASK_STORE` - Optional. `sqlite` (default) or `memory`.
//! - `DATABASE_PATH` - Optional. SQLite file. Defaults to `./tasktune.db`.
//! - `SECRET_KEY` - Access token signing secret. A development default is used (with a warning) when unset.
//! - `REFRESH_SECRET_KEY` - Refresh token signing secret. Same fallback as `SECRET_KEY`.
//! - `ACCESS_TOKEN_TTL_MINUTES` - Optional. Defaults to `1440` (one day). At most one year.
//! - `REFRESH_TOKEN_TTL_DAYS` - Optional. Defaults to `30`. At most ten years.
//! - `PASSWORD_HASH_ITERATIONS` - Optional. PBKDF2 rounds for new hashes. Defaults to `100000`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. HTTP request timeout. Defaults to `60`.
//! - `OPENAI_API_KEY` - Optional. Without it subtask generation uses fallback lists only.
//! - `OPENAI_BASE_URL` - Optional. Defaults to `https://api.openai.com/v1`.
//! - `OPENAI_MODEL` - Optional. Defaults to `gpt-3.5-turbo`.
//! - `SUBTASK_MAX_TOKENS` - Optional. Defaults to `500`.
//! - `SUBTASK_TEMPERATURE` - Optional. Defaults to `0.7`.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::llm::RetryConfig;
use crate::store::StoreType;

const DEV_SECRET_KEY: &str = "tasktune-dev-secret-key";
const DEV_REFRESH_SECRET_KEY: &str = "tasktune-dev-refresh-secret-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub refresh_secret_key: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// PBKDF2 rounds used when hashing new passwords
    pub password_hash_iterations: u32,
}

impl AuthConfig {
    pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;
    pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365 * 10;
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            refresh_secret_key: DEV_REFRESH_SECRET_KEY.to_string(),
            access_token_ttl_minutes: 60 * 24,
            refresh_token_ttl_days: 30,
            password_hash_iterations: crate::auth::DEFAULT_ITERATIONS,
        }
    }
}

/// Subtask generation configuration.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model API key. `None` or blank disables model calls.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f64,
    pub retry: RetryConfig,
}

impl GenerationConfig {
    pub const DEFAULT_MAX_TOKENS: u64 = 500;
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;

    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key().is_some()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::llm::DEFAULT_OPENAI_BASE_URL.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: Self::DEFAULT_TEMPERATURE,
            retry: RetryConfig::default(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Persistence backend
    pub store_type: StoreType,

    /// SQLite database file (sqlite backend only)
    pub database_path: PathBuf,

    /// Per-request timeout for the HTTP layer
    pub request_timeout: Duration,

    pub auth: AuthConfig,

    pub generation: GenerationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("PORT", 8000u16)?;

        let store_type = std::env::var("TASK_STORE")
            .map(|s| StoreType::from_str(&s))
            .unwrap_or_default();
        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tasktune.db"));

        let request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 60u64)?);

        let auth = AuthConfig {
            secret_key: secret_from_env("SECRET_KEY", DEV_SECRET_KEY),
            refresh_secret_key: secret_from_env("REFRESH_SECRET_KEY", DEV_REFRESH_SECRET_KEY),
            access_token_ttl_minutes: parse_env_in_range(
                "ACCESS_TOKEN_TTL_MINUTES",
                60 * 24,
                1..=AuthConfig::MAX_ACCESS_TOKEN_TTL_MINUTES,
            )?,
            refresh_token_ttl_days: parse_env_in_range(
                "REFRESH_TOKEN_TTL_DAYS",
                30,
                1..=AuthConfig::MAX_REFRESH_TOKEN_TTL_DAYS,
            )?,
            password_hash_iterations: parse_env(
                "PASSWORD_HASH_ITERATIONS",
                crate::auth::DEFAULT_ITERATIONS,
            )?
            .max(1),
        };

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_env("SUBTASK_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_env("SUBTASK_TEMPERATURE", defaults.temperature)?,
            retry: defaults.retry,
        };

        Ok(Self {
            host,
            port,
            store_type,
            database_path,
            request_timeout,
            auth,
            generation,
        })
    }

    /// In-memory configuration with development secrets (useful for testing).
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            store_type: StoreType::Memory,
            database_path: PathBuf::from(":memory:"),
            request_timeout: Duration::from_secs(60),
            auth: AuthConfig {
                password_hash_iterations: 1_000,
                ..AuthConfig::default()
            },
            generation: GenerationConfig::default(),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn parse_env_in_range<T>(name: &str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_env(name, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ));
    }
    Ok(value)
}

fn secret_from_env(name: &str, dev_default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            tracing::warn!("{} not set; using an insecure development default", name);
            dev_default.to_string()
        }
    }
}
