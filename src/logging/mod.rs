//! Tracing subscriber setup
//!
//! Human-readable logs go to stderr so stdout stays free for JSON-lines output.
//! A `[logging.file]` section adds a non-blocking JSON copy with rotation. The
//! returned guard must be held until shutdown so buffered lines get flushed.
//!
//! Filter precedence: RUST_LOG env var > `[logging] level` > info.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{level_name, LogFile, LogRotation, LoggingConfig};

/// Filter used when RUST_LOG is not set
pub fn default_filter(config: &LoggingConfig) -> String {
    format!("markstream={},axum=info", level_name(config.level))
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Appender writing `<prefix>.<date>.json` files under the configured directory
pub fn file_appender(file: &LogFile) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(rotation(file.rotation))
        .filename_prefix(&file.prefix)
        .filename_suffix("json")
        .build(&file.dir)
}

/// Install the global subscriber
///
/// A log file that can't be opened is reported on stderr and skipped.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config).into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let appender = config.file.as_ref().and_then(|file| match file_appender(file) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!(
                "Warning: not writing log files to {}: {}",
                file.dir.display(),
                e
            );
            None
        }
    });

    // Writes happen on a background thread
    let (json_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_configured_level() {
        let config = LoggingConfig {
            level: tracing::Level::DEBUG,
            ..Default::default()
        };
        assert_eq!(default_filter(&config), "markstream=debug,axum=info");
        assert!(EnvFilter::try_new(default_filter(&config)).is_ok());
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = std::env::temp_dir().join(format!("markstream-logs-{}", std::process::id()));
        let file = LogFile {
            rotation: LogRotation::Never,
            ..LogFile::in_dir(&dir)
        };
        assert!(file_appender(&file).is_ok());
        assert!(dir.is_dir());
    }
}
