//! Logging setup for the terminal client
//!
//! Diagnostics go to stderr so they never mix with table/JSON output.
//! With a log directory configured, a JSON file layer rolls daily.

use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Level for `-v` repetitions, starting from `base`
    pub fn level_for(base: Option<&str>, verbose: u8) -> String {
        match verbose {
            0 => base.unwrap_or("warn").to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    /// `FLEETVIEW_LOG` wins over `RUST_LOG`, which wins over the level
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env("FLEETVIEW_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber; keep the guard alive until exit
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(io::stderr);

        match &self.directory {
            Some(directory) => {
                let (writer, guard) = non_blocking(rolling::daily(directory, "fleetview.log"));
                let file_layer = fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_writer(writer);

                tracing_subscriber::registry()
                    .with(self.filter())
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()?;
                Ok(Some(guard))
            }
            None => {
                tracing_subscriber::registry()
                    .with(self.filter())
                    .with(console_layer)
                    .try_init()?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::level_for(None, 0), "warn");
        assert_eq!(LoggingConfig::level_for(Some("error"), 0), "error");
        assert_eq!(LoggingConfig::level_for(Some("error"), 1), "info");
        assert_eq!(LoggingConfig::level_for(None, 2), "debug");
        assert_eq!(LoggingConfig::level_for(None, 5), "trace");
    }
}
