//! Environment-driven configuration
//!
//! The fetch run's tunables live here and are read once at startup into
//! plain structs. Notification credentials are the one exception and stay
//! with the notifier. A `.env` file is honored via dotenvy before this
//! module runs.

use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::FeedConfig;

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub portal: PortalConfig,
    /// Contract of every data feed the warehouse loaders consume
    pub feeds: Vec<FeedConfig>,
    /// Where the portal drops its exports: the sales feed's input folder
    pub download_dir: PathBuf,
    /// Drop directory auxiliary raw exports land in before distribution
    pub raw_data_dir: Option<PathBuf>,
    pub database_url: String,
    /// Cron expression; when set the process keeps running on a schedule
    pub schedule: Option<String>,
}

/// Everything one portal session needs to drive a run
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Name the export tool gives its downloads; also the renamed file stem
    pub report_name: String,
    /// Weekday on which the run widens into a lookback window
    pub trigger_weekday: Weekday,
    pub lookback_days: u32,
    pub retry: RetryPolicy,
    pub waits: WaitPolicy,
    pub calendar_offsets: CalendarOffsets,
    pub headless: bool,
    pub browser_path: Option<String>,
}

/// Bounded-retry policy for transient element failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts; zero means retry immediately
    pub backoff: Duration,
}

/// Session-wide wait tuning
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub element_timeout: Duration,
    pub download_timeout: Duration,
    pub poll_interval: Duration,
}

/// Structural offsets of secondary datepicker roots in the portal DOM.
///
/// The first picker sits under a stable class; every further instance is
/// `body > div:nth-child(base + (index - 1) * step)`. Observed values for
/// the current portal build are 70 and 2.
#[derive(Debug, Clone, Copy)]
pub struct CalendarOffsets {
    pub base: u32,
    pub step: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let portal = PortalConfig {
            base_url: require_env("PORTAL_BASE_URL")?,
            username: require_env("PORTAL_USERNAME")?,
            password: require_env("PORTAL_PASSWORD")?,
            report_name: env_or("REPORT_NAME", "TurnoverList"),
            trigger_weekday: parse_weekday(&env_or("TRIGGER_WEEKDAY", "sunday"))?,
            lookback_days: parse_env("LOOKBACK_DAYS", 29)?,
            retry: RetryPolicy {
                max_attempts: parse_env("MAX_RETRY_ATTEMPTS", 3)?,
                backoff: Duration::from_millis(parse_env("RETRY_BACKOFF_MS", 0)?),
            },
            waits: WaitPolicy {
                element_timeout: Duration::from_secs(parse_env("ELEMENT_TIMEOUT_SECS", 10)?),
                download_timeout: Duration::from_secs(parse_env("DOWNLOAD_TIMEOUT_SECS", 10)?),
                poll_interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 500)?),
            },
            calendar_offsets: CalendarOffsets {
                base: parse_env("CALENDAR_OFFSET_BASE", 70)?,
                step: parse_env("CALENDAR_OFFSET_STEP", 2)?,
            },
            headless: parse_env("PORTAL_HEADLESS", true)?,
            browser_path: std::env::var("BROWSER_PATH").ok(),
        };

        let data_root = PathBuf::from(env_or("DATA_ROOT", "data"));
        let feeds = FeedConfig::standard_feeds(&data_root);
        let download_dir = feeds
            .iter()
            .find(|feed| feed.name == "sales")
            .map(|feed| feed.input_dir.clone())
            .context("sales feed missing from the feed table")?;

        Ok(Self {
            portal,
            feeds,
            download_dir,
            raw_data_dir: std::env::var("RAW_DATA_DIR").ok().map(PathBuf::from),
            database_url: env_or("DATABASE_URL", "sqlite:data/turnover.db"),
            schedule: std::env::var("FETCH_SCHEDULE").ok(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{key} has invalid value '{raw}'"))
}

fn parse_weekday(raw: &str) -> Result<Weekday> {
    raw.parse::<Weekday>()
        .map_err(|_| anyhow!("unrecognized weekday '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_names_parse_in_common_spellings() {
        assert_eq!(parse_weekday("sunday").unwrap(), Weekday::Sun);
        assert_eq!(parse_weekday("Sat").unwrap(), Weekday::Sat);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn values_parse_with_surrounding_whitespace() {
        assert_eq!(parse_value::<u32>("LOOKBACK_DAYS", " 14 ").unwrap(), 14);
        assert!(!parse_value::<bool>("PORTAL_HEADLESS", "false").unwrap());
    }

    #[test]
    fn invalid_values_name_the_offending_key() {
        let err = parse_value::<u32>("MAX_RETRY_ATTEMPTS", "three").unwrap_err();

        assert!(err.to_string().contains("MAX_RETRY_ATTEMPTS"));
    }
}
