use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Longest accepted rate-limit window, one year. Keeps the window well inside
/// what Redis `SET EX` and signed second arithmetic can represent.
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 365 * 24 * 3600;

pub const MAX_JOB_INTERVAL_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where rate-limit windows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    Redis,
    Memory,
}

impl FromStr for RateLimitBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per client per window.
    pub request_limit: u32,
    pub time_window_seconds: u64,
    /// Admit requests when the window store cannot be reached.
    pub fail_open: bool,
}

impl RateLimitConfig {
    pub fn new(request_limit: u32, time_window_seconds: u64) -> Self {
        Self {
            request_limit,
            time_window_seconds,
            fail_open: true,
        }
    }

    pub fn time_window(&self) -> Duration {
        Duration::from_secs(self.time_window_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(100, 60)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub jwt_refresh_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit: RateLimitConfig,
    pub rate_limit_backend: RateLimitBackend,
    pub reminder_window_hours: i64,
    pub job_interval_secs: u64,
    pub default_from_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_expiration = hours(&lookup, "JWT_EXPIRATION", 24)?;
        let jwt_refresh_expiration = hours(&lookup, "JWT_REFRESH_EXPIRATION", 24 * 7)?;

        let time_window_seconds = bounded(
            &lookup,
            "RATE_LIMIT_WINDOW",
            60,
            MAX_RATE_LIMIT_WINDOW_SECS,
        )?;

        let rate_limit = RateLimitConfig {
            request_limit: optional(&lookup, "RATE_LIMIT_REQUESTS", 100u32)?,
            time_window_seconds,
            fail_open: flag(&lookup, "RATE_LIMIT_FAIL_OPEN", true)?,
        };

        let rate_limit_backend = match lookup("RATE_LIMIT_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "RATE_LIMIT_BACKEND",
                value,
            })?,
            None => RateLimitBackend::Redis,
        };

        Ok(Config {
            database_url: required(&lookup, "DATABASE_URL")?,
            redis_url: required(&lookup, "REDIS_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            jwt_refresh_expiration_secs: jwt_refresh_expiration * 3600,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: optional(&lookup, "SERVER_PORT", 3000u16)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            rate_limit,
            rate_limit_backend,
            reminder_window_hours: optional(&lookup, "REMINDER_WINDOW_HOURS", 3i64)?,
            job_interval_secs: bounded(&lookup, "JOB_INTERVAL_SECS", 300, MAX_JOB_INTERVAL_SECS)?,
            default_from_email: lookup("DEFAULT_FROM_EMAIL")
                .unwrap_or_else(|| "noreply@tasks.local".into()),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn jwt_refresh_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_refresh_expiration_secs)
    }

    pub fn job_interval(&self) -> Duration {
        Duration::from_secs(self.job_interval_secs)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Reads a count of seconds that must lie in `1..=max`.
fn bounded<F>(lookup: &F, name: &'static str, default: u64, max: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = optional(lookup, name, default)?;
    if value == 0 || value > max {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

// Accepts both "24" and "24h".
fn hours<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .trim_end_matches('h')
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(default),
    }
}
