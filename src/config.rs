use anyhow::{anyhow, Context, Result};
use std::{env, fmt, str::FromStr, time::Duration};

use crate::bot::telegram;
use crate::retry::RetryPolicy;
use crate::store::yandex;

pub const DEFAULT_TABLE_PATH: &str = "disk:/medical_survey.csv";
pub const DEFAULT_PORT: u16 = 3000;

/// A credential that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: Secret,
    pub disk_token: Secret,
    /// Disk path of the survey table, e.g. `disk:/medical_survey.csv`.
    pub table_path: String,
    /// Port of the health-check server.
    pub port: u16,
    pub telegram_api_url: String,
    pub disk_api_url: String,
    pub poll_timeout_secs: u64,
    pub keep_alive: Duration,
    pub startup_retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();
        Ok(Self {
            bot_token: Secret(required(&lookup, "BOT_TOKEN")?),
            disk_token: Secret(required(&lookup, "YANDEX_OAUTH_TOKEN")?),
            table_path: lookup("SURVEY_TABLE_PATH")
                .unwrap_or_else(|| DEFAULT_TABLE_PATH.to_string()),
            port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
            telegram_api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| telegram::DEFAULT_API_URL.to_string()),
            disk_api_url: lookup("YANDEX_API_URL")
                .unwrap_or_else(|| yandex::DEFAULT_API_URL.to_string()),
            poll_timeout_secs: parsed(&lookup, "POLL_TIMEOUT_SECS", 30)?,
            keep_alive: Duration::from_secs(parsed(&lookup, "KEEPALIVE_SECS", 600)?),
            startup_retry: RetryPolicy {
                max_attempts: parsed(&lookup, "STARTUP_MAX_ATTEMPTS", defaults.max_attempts)?,
                initial_backoff: Duration::from_millis(parsed(
                    &lookup,
                    "STARTUP_BACKOFF_MS",
                    defaults.initial_backoff.as_millis() as u64,
                )?),
                max_backoff: defaults.max_backoff,
            },
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("environment variable {key} is not set"))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}
