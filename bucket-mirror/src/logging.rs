//! Logger construction for the CLI.
//!
//! The format is chosen once, at startup, and turned into a [`Dispatch`] that is
//! both installed as the global default and handed to the reconciler.

use std::convert::Infallible;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parses the legacy `SYNC_LOGGER` value: `json` (any case) selects JSON,
    /// anything else plain text.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// `clap` value parser for `--log-format` / `SYNC_LOGGER`. Never fails.
pub fn parse_log_format(value: &str) -> Result<LogFormat, Infallible> {
    Ok(LogFormat::from_env_value(value))
}

/// Builds a logger writing to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Stdout is left to the JSON report.
pub fn build_logger(format: LogFormat) -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    }
}

/// Installs `logger` as the process-wide default. Returns false if one was already set.
pub fn install(logger: &Dispatch) -> bool {
    tracing::dispatcher::set_global_default(logger.clone()).is_ok()
}
