//! Logging setup shared by every `gol-*` binary
//!
//! Logs always go to stderr so that stdout stays clean for `--format json`
//! output. The format and level come from command-line flags first, then
//! `GOLAZO_LOG_FORMAT` / `GOLAZO_LOG_LEVEL`, then `RUST_LOG`.
//!
//! ```no_run
//! use libgolazo::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//! ```

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain text without target, for terminals and pipes
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line coloured output for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Build the configuration a CLI tool runs with
    ///
    /// `format` is the value of the tool's `--log-format` flag, if given.
    /// Tools are quiet by default (`warn`); `--verbose` switches to `debug`.
    pub fn for_cli(format: Option<LogFormat>, verbose: bool) -> Self {
        let format = format
            .or_else(|| {
                std::env::var("GOLAZO_LOG_FORMAT")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_default();
        let level = std::env::var("GOLAZO_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        Self::new(format, level, verbose)
    }

    fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// A second call is ignored, so tests may initialise logging freely.
    pub fn init(&self) {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("logging already initialised");
        }
    }
}

/// Initialize logging from `GOLAZO_LOG_FORMAT` and `GOLAZO_LOG_LEVEL`
pub fn init_default() {
    LoggingConfig::for_cli(None, false).init();
}
