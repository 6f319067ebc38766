// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wait configuration and Go-style duration parsing.
//!
//! [`WaitConfig`] governs every polling loop: how often the resource is read, after how
//! long errors stop being retried, and when to give up. Durations are written the way
//! Gardener configuration writes them ("5s", "30s", "3m", "1h", "500ms"), both in
//! serialized configuration and in the environment overrides read by
//! [`WaitConfig::from_env`].

use crate::constants::{
    DEFAULT_WAIT_INTERVAL_SECS, DEFAULT_WAIT_SEVERE_THRESHOLD_SECS, DEFAULT_WAIT_TIMEOUT_SECS,
    ENV_WAIT_INTERVAL, ENV_WAIT_SEVERE_THRESHOLD, ENV_WAIT_TIMEOUT,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1000;
const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Polling strategy for waiting on an extension resource.
///
/// # Example
///
/// ```
/// use extension_lifecycle::config::WaitConfig;
/// use std::time::Duration;
///
/// let config: WaitConfig =
///     serde_json::from_str(r#"{"interval":"2s","severeThreshold":"20s","timeout":"2m"}"#)
///         .unwrap();
/// assert_eq!(config.timeout, Duration::from_secs(120));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitConfig {
    /// Time between two reads of the resource
    #[serde(with = "go_duration")]
    pub interval: Duration,

    /// Elapsed time after which severe conditions fail the wait immediately
    #[serde(with = "go_duration")]
    pub severe_threshold: Duration,

    /// Overall wait budget
    #[serde(with = "go_duration")]
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_WAIT_INTERVAL_SECS),
            severe_threshold: Duration::from_secs(DEFAULT_WAIT_SEVERE_THRESHOLD_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl WaitConfig {
    #[must_use]
    pub fn new(interval: Duration, severe_threshold: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            severe_threshold,
            timeout,
        }
    }

    /// The same strategy with a different timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Defaults overridden by `EXTENSION_WAIT_INTERVAL`, `EXTENSION_WAIT_SEVERE_THRESHOLD`
    /// and `EXTENSION_WAIT_TIMEOUT` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable duration, or if the
    /// resulting interval is zero.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_WAIT_INTERVAL) {
            config.interval =
                parse_duration(&value).with_context(|| format!("invalid {ENV_WAIT_INTERVAL}"))?;
        }
        if let Ok(value) = std::env::var(ENV_WAIT_SEVERE_THRESHOLD) {
            config.severe_threshold = parse_duration(&value)
                .with_context(|| format!("invalid {ENV_WAIT_SEVERE_THRESHOLD}"))?;
        }
        if let Ok(value) = std::env::var(ENV_WAIT_TIMEOUT) {
            config.timeout =
                parse_duration(&value).with_context(|| format!("invalid {ENV_WAIT_TIMEOUT}"))?;
        }

        if config.interval.is_zero() {
            bail!("{ENV_WAIT_INTERVAL} must be greater than zero");
        }

        Ok(config)
    }
}

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// Supported units: `ms`, `s`, `m`, `h`. A single unit per string.
///
/// # Examples
///
/// ```
/// use extension_lifecycle::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert!(parse_duration("10").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, has no unit, has an unknown unit, or
/// overflows.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    let split_pos = duration_str
        .chars()
        .position(|c| !c.is_ascii_digit())
        .context("Duration must end with a unit (ms, s, m, or h)")?;

    let (value_str, unit) = duration_str.split_at(split_pos);

    let value: u64 = value_str
        .parse()
        .context("Duration value must be a positive integer")?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(
            value
                .checked_mul(SECONDS_PER_MINUTE)
                .context("Duration value too large (overflow)")?,
        ),
        "h" => Duration::from_secs(
            value
                .checked_mul(SECONDS_PER_HOUR)
                .context("Duration value too large (overflow)")?,
        ),
        _ => bail!("Unsupported duration unit '{unit}'. Use 'ms', 's', 'm', or 'h'"),
    };

    Ok(duration)
}

/// Format a duration with the largest unit that represents it exactly.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let whole_seconds = u128::from(MILLIS_PER_SECOND);
    if millis % whole_seconds != 0 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs != 0 && secs % SECONDS_PER_HOUR == 0 {
        format!("{}h", secs / SECONDS_PER_HOUR)
    } else if secs != 0 && secs % SECONDS_PER_MINUTE == 0 {
        format!("{}m", secs / SECONDS_PER_MINUTE)
    } else {
        format!("{secs}s")
    }
}

mod go_duration {
    use super::{format_duration, parse_duration};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(|e| D::Error::custom(format!("{e:#}")))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
