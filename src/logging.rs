//! Tracing subscriber setup for the CLI.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "SUTABA_LOG";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber. Logs go to stderr so stdout stays usable
/// for command output.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));

    if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
    } else {
        let pretty_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
    }
}
