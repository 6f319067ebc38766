// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Logging setup for binaries embedding this library.
//!
//! The library itself only emits `tracing` events. Operators call [`init_logging`] once at
//! startup to install a subscriber:
//!
//! - `RUST_LOG` selects the filter, defaulting to `info`
//! - `RUST_LOG_FORMAT=json` switches from compact text to JSON lines
//!
//! Example: `RUST_LOG=extension_lifecycle=debug RUST_LOG_FORMAT=json`

use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse a `RUST_LOG_FORMAT` value. Anything but `json` is text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// The format selected by `RUST_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("RUST_LOG_FORMAT")
            .map(|value| Self::parse(&value))
            .unwrap_or(Self::Text)
    }
}

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false);

    match LogFormat::from_env() {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install JSON subscriber: {e}"))?,
        LogFormat::Text => builder
            .with_ansi(true)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install text subscriber: {e}"))?,
    }

    tracing::debug!("Logging initialized with file and line number tracking");
    Ok(())
}
