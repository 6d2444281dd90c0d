//! Tracing subscriber setup for the binary and for embedding applications.

use std::env;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter used when `RUST_LOG` is unset (e.g. "info", "media_cache=debug")
    pub log_level: String,
    /// Emit JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl TracingConfig {
    /// Create a configuration with the given default filter.
    pub fn new(log_level: impl Into<String>) -> Self {
        Self {
            log_level: log_level.into(),
            json_logs: false,
        }
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
    }
}

/// Install a global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Errors
///
/// Fails if the filter is invalid or a global subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
