//! [logging] section
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! # Present only when a JSON copy of the log should be written to disk
//! [logging.file]
//! dir = "./logs"
//! rotation = "hourly"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// How often the JSON log file starts over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "unknown log rotation {:?} (expected hourly, daily or never)",
                other
            )),
        }
    }
}

impl fmt::Display for LogRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the JSON log copy goes
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    pub dir: PathBuf,
    /// File names start with this, e.g. `markstream.2024-01-15.json`
    pub prefix: String,
    pub rotation: LogRotation,
}

impl LogFile {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: env!("CARGO_PKG_NAME").to_string(),
            rotation: LogRotation::default(),
        }
    }
}

/// Effective logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Most verbose level recorded for this crate's own events
    pub level: Level,
    /// `None` logs to stderr only
    pub file: Option<LogFile>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file: None,
        }
    }
}

/// `[logging]` as written in the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file: Option<FileLogFile>,
}

/// `[logging.file]` as written in the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogFile {
    pub dir: Option<String>,
    pub prefix: Option<String>,
    pub rotation: Option<String>,
}

impl LoggingConfig {
    /// Resolve the section, noting values that had to be replaced
    pub fn from_file(file: Option<FileLogging>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let level = match file.level {
            Some(raw) => raw.parse::<Level>().unwrap_or_else(|_| {
                warnings.push(format!(
                    "[logging] level {:?} is not a log level, using {}",
                    raw,
                    level_name(defaults.level)
                ));
                defaults.level
            }),
            None => defaults.level,
        };

        let log_file = file.file.map(|section| {
            let mut log_file = LogFile::in_dir(section.dir.as_deref().unwrap_or("./logs"));
            if let Some(prefix) = section.prefix.filter(|p| !p.trim().is_empty()) {
                log_file.prefix = prefix;
            }
            if let Some(raw) = section.rotation {
                match raw.parse() {
                    Ok(rotation) => log_file.rotation = rotation,
                    Err(e) => warnings.push(format!(
                        "[logging.file] {}, rotating {}",
                        e, log_file.rotation
                    )),
                }
            }
            log_file
        });

        Self {
            level,
            file: log_file,
        }
    }
}

/// Lowercase level name as written in config files and filter directives
pub fn level_name(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}
