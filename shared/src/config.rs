//! Configuration management for the schedule request function.

use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const MAX_EVENT_DURATION_MINUTES: i64 = 24 * 60;

/// Where a secret value comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Value given directly in the environment
    Value(String),
    /// ARN of a Secrets Manager secret holding the value
    SecretArn(String),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Value(_) => f.write_str("Value(<redacted>)"),
            SecretSource::SecretArn(arn) => f.debug_tuple("SecretArn").field(arn).finish(),
        }
    }
}

/// Where the Google service-account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Path to a service-account JSON key file
    File(PathBuf),
    /// ARN of a Secrets Manager secret holding the JSON key
    SecretArn(String),
}

/// Settings for the Gemini extraction service.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key source
    pub api_key: SecretSource,
    /// Model name, e.g. `gemini-1.5-pro-latest`
    pub model: String,
    /// API base URL without trailing slash
    pub base_url: String,
    /// Timeout for a single attempt
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Backoff step between attempts (multiplied by the attempt number)
    pub retry_backoff: Duration,
}

/// Settings for the Google Calendar service.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Target calendar (`primary` or an address)
    pub calendar_id: String,
    /// Service-account key source
    pub credentials: CredentialSource,
    /// API base URL without trailing slash
    pub base_url: String,
    /// Timeout for token exchange and insert
    pub timeout: Duration,
}

/// Policy applied when turning requests into events.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    /// Time zone requests are interpreted in and events are created in
    pub time_zone: Tz,
    /// Duration assumed when no end time is given; `None` requires an explicit end
    pub default_event_duration: Option<chrono::Duration>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            default_event_duration: Some(chrono::Duration::minutes(60)),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub calendar: CalendarConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = match (var("GEMINI_API_KEY"), var("GEMINI_API_KEY_SECRET_ARN")) {
            (Some(key), _) => SecretSource::Value(key),
            (None, Some(arn)) => SecretSource::SecretArn(arn),
            (None, None) => {
                return Err(Error::Config(
                    "GEMINI_API_KEY or GEMINI_API_KEY_SECRET_ARN must be set".to_string(),
                ))
            }
        };

        let credentials = match (
            var("GOOGLE_APPLICATION_CREDENTIALS"),
            var("GOOGLE_CREDENTIALS_SECRET_ARN"),
        ) {
            (Some(path), _) => CredentialSource::File(PathBuf::from(path)),
            (None, Some(arn)) => CredentialSource::SecretArn(arn),
            (None, None) => {
                return Err(Error::Config(
                    "GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_CREDENTIALS_SECRET_ARN must be set"
                        .to_string(),
                ))
            }
        };

        let calendar_id = var("CALENDAR_ID")
            .ok_or_else(|| Error::Config("CALENDAR_ID must be set".to_string()))?;

        let time_zone = match var("SCHEDULE_TIME_ZONE") {
            Some(name) => Tz::from_str(name.trim())
                .map_err(|_| Error::Config(format!("Unknown time zone: {}", name)))?,
            None => Tz::UTC,
        };

        let duration_minutes: i64 = parse_number(&var, "DEFAULT_EVENT_DURATION_MINUTES", 60)?;
        if !(0..=MAX_EVENT_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(Error::Config(format!(
                "DEFAULT_EVENT_DURATION_MINUTES must be between 0 and {}, got {}",
                MAX_EVENT_DURATION_MINUTES, duration_minutes
            )));
        }
        let default_event_duration = match duration_minutes {
            0 => None,
            minutes => Some(chrono::Duration::try_minutes(minutes).ok_or_else(|| {
                Error::Config(format!("DEFAULT_EVENT_DURATION_MINUTES out of range: {}", minutes))
            })?),
        };

        Ok(Self {
            gemini: GeminiConfig {
                api_key,
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: trim_base(
                    var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                ),
                timeout: Duration::from_secs(parse_number(&var, "GEMINI_TIMEOUT_SECS", 30)?),
                max_retries: parse_number(&var, "GEMINI_MAX_RETRIES", 1)?,
                retry_backoff: Duration::from_millis(500),
            },
            calendar: CalendarConfig {
                calendar_id,
                credentials,
                base_url: trim_base(
                    var("CALENDAR_API_BASE")
                        .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string()),
                ),
                timeout: Duration::from_secs(parse_number(&var, "CALENDAR_TIMEOUT_SECS", 10)?),
            },
            schedule: ScheduleConfig {
                time_zone,
                default_event_duration,
            },
        })
    }
}

fn parse_number<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got {:?}", key, raw))),
        None => Ok(default),
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
