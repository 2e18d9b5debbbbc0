//! Logging setup for hosts that don't install their own subscriber.
//!
//! [`ClusterBundle`](crate::ClusterBundle) calls [`init`] when it runs, so a
//! host that sets one of these variables gets bundle logs without extra
//! wiring:
//!
//! - `PRAX_DEBUG=true|1|yes` - log at debug
//! - `PRAX_LOG_LEVEL=trace|debug|info|warn|error` - log at that level
//! - `PRAX_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! With neither `PRAX_DEBUG` nor `PRAX_LOG_LEVEL` set, nothing is installed
//! and the host's own subscriber (if any) sees the events.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// What [`init`] would install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Level for the bundle's crates; `None` means logging was not requested.
    pub level: Option<&'static str>,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read `PRAX_DEBUG`, `PRAX_LOG_LEVEL` and `PRAX_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_values(
            env::var("PRAX_DEBUG").ok().as_deref(),
            env::var("PRAX_LOG_LEVEL").ok().as_deref(),
            env::var("PRAX_LOG_FORMAT").ok().as_deref(),
        )
    }

    /// Resolve settings from raw variable values.
    ///
    /// An explicit level wins; an unknown one falls back to "warn". Debug
    /// mode alone selects "debug".
    pub fn from_values(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let debug = debug.is_some_and(|v| {
            matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
        });

        let level = match level {
            Some(level) => Some(known_level(level).unwrap_or("warn")),
            None if debug => Some("debug"),
            None => None,
        };

        Self {
            level,
            format: format.map(LogFormat::parse).unwrap_or_default(),
        }
    }

    /// Filter directives for the bundle's crates at the configured level.
    pub fn directives(&self) -> Option<String> {
        self.level.map(|level| {
            format!("prax_bundle={level},prax_scylladb={level},prax_axum={level},scylla=warn")
        })
    }
}

fn known_level(level: &str) -> Option<&'static str> {
    ["trace", "debug", "info", "warn", "error"]
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(level))
}

/// Install a global subscriber once, if logging was requested.
///
/// A no-op without the `tracing-subscriber` feature, when another subscriber
/// is already installed, and on every call after the first.
pub fn init() {
    INIT.call_once(|| install(LogSettings::from_env()));
}

#[cfg(feature = "tracing-subscriber")]
fn install(settings: LogSettings) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let Some(directives) = settings.directives() else {
        return;
    };
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(level = ?settings.level, format = ?settings.format, "Bundle logging initialized");
    }
}

#[cfg(not(feature = "tracing-subscriber"))]
fn install(_settings: LogSettings) {}
