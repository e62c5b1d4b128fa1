//! Configuration for a countdown.
//!
//! `CountdownConfig` is deserialized with `serde`, so every field can come from a
//! TOML file or `COUNTDOWN_*` environment variables. Missing fields fall back
//! to the documented defaults below.

use crate::format::FormatOptions;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables read by [`CountdownConfig::load`].
pub const ENV_PREFIX: &str = "COUNTDOWN";

/// All settings of a countdown except the target itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountdownConfig {
    /// Fractional-second digits kept in `total`. Clamped into `[0, 20]`. Default 0.
    #[serde(default)]
    pub precision: i32,

    /// The target is a remaining duration supplied by the host, and the
    /// countdown never schedules itself. Default false.
    #[serde(default)]
    pub controlled: bool,

    /// Milliseconds between scheduled recomputes. Default 1000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Fold days into hours when formatting. Default false.
    #[serde(default)]
    pub days_in_hours: bool,

    /// Pad length for time fields. Default 2.
    #[serde(default = "default_zero_pad")]
    pub zero_pad_time: usize,

    /// Pad length for days. Defaults to `zero_pad_time`.
    #[serde(default)]
    pub zero_pad_days: Option<usize>,

    /// Keep counting (negative totals) once the target has passed. Default false.
    #[serde(default)]
    pub overtime: bool,

    /// IANA zone used for text targets without an offset (e.g. "Europe/Paris").
    /// Defaults to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

impl CountdownConfig {
    /// Loads the configuration from an optional TOML file, then overlays
    /// `COUNTDOWN_*` environment variables (e.g. `COUNTDOWN_INTERVAL_MS=250`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to read countdown configuration")?
            .try_deserialize()
            .context("invalid countdown configuration")
    }

    /// The recompute period. A zero interval is treated as one millisecond.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            days_in_hours: self.days_in_hours,
            zero_pad_time: self.zero_pad_time,
            zero_pad_days: self.zero_pad_days.unwrap_or(self.zero_pad_time),
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            precision: 0,
            controlled: false,
            interval_ms: default_interval_ms(),
            days_in_hours: false,
            zero_pad_time: default_zero_pad(),
            zero_pad_days: None,
            overtime: false,
            timezone: default_timezone(),
        }
    }
}

// --- Default value functions for serde ---

fn default_interval_ms() -> u64 {
    1_000
}

fn default_zero_pad() -> usize {
    2
}

fn default_timezone() -> Tz {
    Tz::UTC
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn from_toml(text: &str) -> CountdownConfig {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(from_toml(""), CountdownConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = from_toml(
            r#"
            precision = 2
            interval_ms = 250
            days_in_hours = true
            zero_pad_time = 3
            timezone = "Asia/Tokyo"
            "#,
        );
        assert_eq!(config.precision, 2);
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.timezone, Tz::Asia__Tokyo);
        assert!(!config.controlled);

        let format = config.format_options();
        assert!(format.days_in_hours);
        assert_eq!(format.zero_pad_time, 3);
        assert_eq!(format.zero_pad_days, 3);
    }

    #[test]
    fn zero_interval_is_bumped() {
        let config = CountdownConfig {
            interval_ms: 0,
            ..CountdownConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_millis(1));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = CountdownConfig::load(None).unwrap();
        assert_eq!(config.interval_ms, 1_000);
    }
}
