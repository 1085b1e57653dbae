//! Process configuration.
//!
//! Built once at startup and handed to service constructors by reference;
//! nothing below the binary reads the environment.

use chrono::Duration;
use thiserror::Error;

/// Placeholder secret that must never be accepted.
pub const INSECURE_SECRET_PLACEHOLDER: &str = "fallback-secret-key-change-in-production";

pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
pub const DEFAULT_MAX_ACTIVE_TOKENS: usize = 5;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Upper bounds on configured lifetimes; expiry timestamps must stay representable.
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365 * 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings consumed by the credential core and the server binary.
#[derive(Clone)]
pub struct Settings {
    /// HS256 signing secret.
    pub secret_key: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Ceiling on simultaneously active, unexpired tokens per user (access and refresh together).
    pub max_active_tokens: usize,
    pub database_url: Option<String>,
    pub bind_addr: String,
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("secret_key", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("max_active_tokens", &self.max_active_tokens)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Settings {
    /// Settings with default lifetimes and ceiling.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
            max_active_tokens: DEFAULT_MAX_ACTIVE_TOKENS,
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    pub fn with_max_active_tokens(mut self, limit: usize) -> Self {
        self.max_active_tokens = limit;
        self
    }

    pub fn with_token_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Recognised keys: `SECRET_KEY` (required), `ACCESS_TOKEN_EXPIRE_MINUTES`,
    /// `REFRESH_TOKEN_EXPIRE_DAYS`, `MAX_ACTIVE_TOKENS`, `DATABASE_URL`, `BIND_ADDR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;

        if secret_key == INSECURE_SECRET_PLACEHOLDER {
            return Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                reason: "placeholder value is not allowed".to_string(),
            });
        }

        let access_minutes = parse_positive(
            &lookup,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            DEFAULT_ACCESS_TOKEN_MINUTES,
            MAX_ACCESS_TOKEN_MINUTES,
        )?;
        let refresh_days = parse_positive(
            &lookup,
            "REFRESH_TOKEN_EXPIRE_DAYS",
            DEFAULT_REFRESH_TOKEN_DAYS,
            MAX_REFRESH_TOKEN_DAYS,
        )?;
        let max_active = parse_positive(
            &lookup,
            "MAX_ACTIVE_TOKENS",
            DEFAULT_MAX_ACTIVE_TOKENS as i64,
            i64::from(u32::MAX),
        )?;

        let access_token_ttl =
            Duration::try_minutes(access_minutes).ok_or(ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                reason: "out of range".to_string(),
            })?;
        let refresh_token_ttl = Duration::try_days(refresh_days).ok_or(ConfigError::Invalid {
            key: "REFRESH_TOKEN_EXPIRE_DAYS",
            reason: "out of range".to_string(),
        })?;

        Ok(Self {
            secret_key,
            access_token_ttl,
            refresh_token_ttl,
            max_active_tokens: max_active as usize,
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn parse_positive<F>(
    lookup: &F,
    key: &'static str,
    default: i64,
    max: i64,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let value: i64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{e}"),
    })?;

    if value <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be positive".to_string(),
        });
    }
    if value > max {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must not exceed {max}"),
        });
    }

    Ok(value)
}
