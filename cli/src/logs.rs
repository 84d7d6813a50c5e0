//! Diagnostics and user-facing output

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AppError;

/// Sink for user-facing messages ("Successfully released ...").
///
/// Kept separate from `tracing` so callers and tests can capture exactly
/// what the user would see.
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Logger printing each message on its own stdout line
pub fn stdout_logger() -> Logger {
    Arc::new(|message: &str| println!("{}", message))
}

/// Verbosity of the diagnostics written to stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    #[serde(alias = "warning")]
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" => Ok(LogLevel::Off),
            other => Err(format!(
                "Invalid log level \"{}\", expected one of trace, debug, info, warn, error, off",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub log_level: LogLevel,

    /// One JSON object per line instead of human readable text
    pub json_format: bool,
}

/// Install the global subscriber.
///
/// Diagnostics go to stderr so they never interleave with user-facing
/// stdout output. `RUST_LOG` directives take precedence over `log_level`.
pub fn init_logging(options: LogOptions) -> Result<(), AppError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(options.log_level).into())
        .from_env_lossy();

    let json = options
        .json_format
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text = (!options.json_format).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| AppError::ConfigError(format!("Could not initialize logging: {}", e)))
}
