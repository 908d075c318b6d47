use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::assistant::AssistantOptions;
use crate::rate_limit::{SlidingWindowLimiter, DEFAULT_MAX_REQUESTS};
use crate::settings::SettingsDefaults;
use crate::timezone::ReportingZone;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Service configuration loaded from environment variables.
///
/// | Env Var                   | Default            |
/// |---------------------------|--------------------|
/// | `DATABASE_PATH`           | `data/ideas.db`    |
/// | `BIND_ADDR`               | `127.0.0.1:21960`  |
/// | `LOG_LEVEL`               | `info`             |
/// | `LOG_DIR`                 | unset              |
/// | `REPORT_UTC_OFFSET_HOURS` | `3`                |
/// | `DIGEST_TIME`             | `08:00`            |
/// | `TIMEZONE`                | `Europe/Moscow`    |
/// | `RATE_LIMIT_MAX_REQUESTS` | `15`               |
/// | `RATE_LIMIT_WINDOW_SECS`  | `60`               |
/// | `PAGE_SIZE`               | `5`                |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Daily-rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
    pub report_offset_hours: i32,
    pub digest_time: String,
    pub timezone: String,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let report_offset_hours = parse(&get, "REPORT_UTC_OFFSET_HOURS", 3)?;
        if ReportingZone::from_hours(report_offset_hours).is_none() {
            return Err(ConfigError::Invalid {
                key: "REPORT_UTC_OFFSET_HOURS",
                value: report_offset_hours.to_string(),
            });
        }

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/ideas.db")),
            bind_addr: parse(&get, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 21960)))?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            report_offset_hours,
            digest_time: get("DIGEST_TIME")
                .unwrap_or_else(|| idea_inbox_schemas::DEFAULT_DIGEST_TIME.into()),
            timezone: get("TIMEZONE").unwrap_or_else(|| idea_inbox_schemas::DEFAULT_TIMEZONE.into()),
            rate_limit_max_requests: parse(&get, "RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS)?,
            rate_limit_window_secs: parse(&get, "RATE_LIMIT_WINDOW_SECS", 60)?,
            page_size: parse(&get, "PAGE_SIZE", 5)?,
        })
    }

    pub fn reporting_zone(&self) -> ReportingZone {
        ReportingZone::from_hours(self.report_offset_hours).unwrap_or_default()
    }

    pub fn rate_limiter(&self) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(
            self.rate_limit_max_requests,
            Duration::from_secs(self.rate_limit_window_secs),
        )
    }

    pub fn assistant_options(&self) -> AssistantOptions {
        AssistantOptions {
            page_size: self.page_size,
            settings: SettingsDefaults {
                digest_time: self.digest_time.clone(),
                timezone: self.timezone.clone(),
            },
        }
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}
