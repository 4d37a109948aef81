//! Run configuration loaded from TOML.
//!
//! The configuration is an explicit value handed to the run gate and the
//! pipeline; nothing reads it from global state.

use chrono::{FixedOffset, Weekday};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Market page URL.
    pub source_url: String,

    /// Workbook path, read at the start of a run and replaced at the end.
    pub output_file: PathBuf,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    pub trading_hours: TradingHours,

    pub email: EmailSchedule,
}

/// Weekdays and hours during which scheduled runs fetch prices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradingHours {
    /// First hour of the window (inclusive).
    pub start: u32,

    /// Hour the window closes (exclusive).
    pub end: u32,

    #[serde(default = "default_trading_days", deserialize_with = "weekday_list")]
    pub days: Vec<Weekday>,

    #[serde(default = "default_timezone", deserialize_with = "fixed_offset")]
    pub timezone: FixedOffset,
}

/// When the weekly portfolio email goes out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailSchedule {
    #[serde(deserialize_with = "weekday")]
    pub send_on: Weekday,

    pub send_at_hour: u32,

    /// Only the first N minutes of the send hour qualify. `None` means the
    /// whole hour.
    #[serde(default)]
    pub send_window_minutes: Option<u32>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the trading window for this invocation only.
    pub fn with_hours_override(
        mut self,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Result<Self, ConfigError> {
        if let Some(start) = start {
            self.trading_hours.start = start;
        }
        if let Some(end) = end {
            self.trading_hours.end = end;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.source_url)
            .map_err(|e| ConfigError::Invalid(format!("source_url '{}': {e}", self.source_url)))?;

        if self.output_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_file is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }

        let hours = &self.trading_hours;
        check_hour("trading_hours.start", hours.start)?;
        check_hour("trading_hours.end", hours.end)?;
        if hours.start >= hours.end {
            return Err(ConfigError::Invalid(format!(
                "trading_hours.start ({}) must be before trading_hours.end ({})",
                hours.start, hours.end
            )));
        }
        if hours.days.is_empty() {
            return Err(ConfigError::Invalid("trading_hours.days is empty".into()));
        }

        check_hour("email.send_at_hour", self.email.send_at_hour)?;
        if let Some(window) = self.email.send_window_minutes {
            if !(1..=60).contains(&window) {
                return Err(ConfigError::Invalid(format!(
                    "email.send_window_minutes must be 1-60, got {window}"
                )));
            }
        }

        Ok(())
    }
}

fn check_hour(name: &str, hour: u32) -> Result<(), ConfigError> {
    if hour > 23 {
        return Err(ConfigError::Invalid(format!("{name} must be 0-23, got {hour}")));
    }
    Ok(())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_trading_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

/// East Africa Time, the exchange's local zone.
fn default_timezone() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).expect("UTC+3 is a valid offset")
}

/// Parse a weekday name such as `Monday` or `mon`.
pub fn parse_weekday(name: &str) -> Result<Weekday, String> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("unknown weekday '{name}'"))
}

/// Parse a fixed-offset zone: `UTC`, a known abbreviation such as `EAT`,
/// or a signed offset like `+03:00`, `+0300` or `-05`.
pub fn parse_offset(text: &str) -> Result<FixedOffset, String> {
    let text = text.trim();
    let named = match text.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => Some(0),
        "WAT" => Some(3600),
        "CAT" | "SAST" => Some(2 * 3600),
        "EAT" => Some(3 * 3600),
        _ => None,
    };
    if let Some(secs) = named {
        return FixedOffset::east_opt(secs).ok_or_else(|| format!("invalid offset '{text}'"));
    }

    let (sign, rest) = match text.chars().next() {
        Some('+') => (1, &text[1..]),
        Some('-') => (-1, &text[1..]),
        _ => return Err(format!("unrecognised timezone '{text}'")),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("unrecognised timezone '{text}'"));
    }
    let (hh, mm) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(format!("unrecognised timezone '{text}'")),
    };
    let hours: i32 = hh.parse().map_err(|_| format!("invalid offset hours in '{text}'"))?;
    let minutes: i32 = mm
        .parse()
        .map_err(|_| format!("invalid offset minutes in '{text}'"))?;
    if hours > 14 || minutes > 59 {
        return Err(format!("offset out of range '{text}'"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset out of range '{text}'"))
}

fn weekday<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
    let name = String::deserialize(deserializer)?;
    parse_weekday(&name).map_err(de::Error::custom)
}

fn weekday_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Weekday>, D::Error> {
    let names = Vec::<String>::deserialize(deserializer)?;
    names
        .iter()
        .map(|name| parse_weekday(name).map_err(de::Error::custom))
        .collect()
}

fn fixed_offset<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_offset(&text).map_err(de::Error::custom)
}
