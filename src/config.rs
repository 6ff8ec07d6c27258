use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::attendance::calendar::{DayBoundary, ExpansionLimits};
use crate::attendance::retry::RetryPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Reference time zone deciding which day a check-in belongs to.
    pub day_boundary: DayBoundary,

    pub read_retry: RetryPolicy,
    /// Caps on gap filling and leave ranges.
    pub limits: ExpansionLimits,
    pub directory_cache_ttl: Duration,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let offset_minutes: i32 = parse_or("ATTENDANCE_UTC_OFFSET_MINUTES", 0)?;
        let day_boundary = DayBoundary::from_offset_minutes(offset_minutes).ok_or_else(|| {
            anyhow!("ATTENDANCE_UTC_OFFSET_MINUTES out of range: {offset_minutes}")
        })?;

        let defaults = ExpansionLimits::default();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            day_boundary,

            read_retry: RetryPolicy {
                attempts: parse_or("READ_RETRY_ATTEMPTS", 3)?,
                backoff: Duration::from_millis(parse_or("READ_RETRY_BACKOFF_MS", 50)?),
            },
            limits: ExpansionLimits {
                max_fill_gap_cells: parse_or("MAX_FILL_GAP_CELLS", defaults.max_fill_gap_cells)?,
                max_leave_days: parse_or("MAX_LEAVE_DAYS", defaults.max_leave_days)?,
            },
            directory_cache_ttl: Duration::from_secs(parse_or("DIRECTORY_CACHE_TTL_SECS", 300)?),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
