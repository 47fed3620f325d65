//! Logging setup.
//!
//! Library code only emits `tracing` events: one `warn!` per coerced or skipped
//! line, `info!` at the start and end of each source, `debug!` per batch. Binaries
//! and tests that want to see them install a subscriber with [`init_logging`].
//!
//! ```no_run
//! use ingestbeam::logging::{LogConfig, init_logging};
//!
//! # fn main() -> anyhow::Result<()> {
//! init_logging(&LogConfig::from_env()?)?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the minimum level.
pub const LEVEL_ENV: &str = "INGEST_LOG_LEVEL";
/// Environment variable holding the output format.
pub const FORMAT_ENV: &str = "INGEST_LOG_FORMAT";

/// Minimum severity of events that are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow!("invalid log level: {s}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Line format of printed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event, fields included.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow!("invalid log format: {s}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma separated (e.g. `ingestbeam::runner=debug`).
    pub filter_directives: Option<String>,
    pub include_targets: bool,
    pub include_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            filter_directives: None,
            include_targets: true,
            include_thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `INGEST_LOG_LEVEL` and `INGEST_LOG_FORMAT`.
    ///
    /// # Errors
    /// Fails if either variable holds an unrecognized value.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var(LEVEL_ENV) {
            cfg.level = level.parse().with_context(|| format!("read {LEVEL_ENV}"))?;
        }
        if let Ok(format) = std::env::var(FORMAT_ENV) {
            cfg.format = format.parse().with_context(|| format!("read {FORMAT_ENV}"))?;
        }
        Ok(cfg)
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the event filter: `RUST_LOG` first, then the level, then extra directives.
    ///
    /// # Errors
    /// Fails on a directive that does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter =
            EnvFilter::from_default_env().add_directive(self.level.to_tracing_level().into());
        if let Some(directives) = &self.filter_directives {
            for d in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                filter = filter.add_directive(
                    d.parse()
                        .with_context(|| format!("parse filter directive {d:?}"))?,
                );
            }
        }
        Ok(filter)
    }
}

/// Install the global subscriber, writing to stderr.
///
/// # Errors
/// Fails on a bad filter directive or if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Text => registry
            .with(
                tfmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_targets)
                    .with_thread_ids(config.include_thread_ids),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tfmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_targets)
                    .with_thread_ids(config.include_thread_ids),
            )
            .try_init(),
    }
    .context("install tracing subscriber")
}
