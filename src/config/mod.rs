//! Configuration for the display server and CLI
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/markstream/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Loading happens before logging is set up, so values that had to be
//! replaced are collected in [`Config::warnings`] and logged afterwards.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

mod logging;
mod render;
mod serialization;
mod simulation;


pub use logging::{level_name, FileLogFile, FileLogging, LogFile, LogRotation, LoggingConfig};
pub use render::{FileRender, RenderConfig};
pub use simulation::{FileSimulation, SimulationConfig};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server address (the component dev server port)
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

pub const ENV_BIND: &str = "MARKSTREAM_BIND";
pub const ENV_THEME: &str = "MARKSTREAM_THEME";
pub const ENV_LOG_DIR: &str = "MARKSTREAM_LOG_DIR";
pub const ENV_DEV_SERVER: &str = "MARKSTREAM_DEV_SERVER";
pub const ENV_ALLOWED_UPSTREAMS: &str = "MARKSTREAM_ALLOWED_UPSTREAMS";

/// Every variable that overrides the config file
pub const ENV_OVERRIDES: [&str; 5] = [
    ENV_BIND,
    ENV_THEME,
    ENV_LOG_DIR,
    ENV_DEV_SERVER,
    ENV_ALLOWED_UPSTREAMS,
];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the demonstration server binds to
    pub bind_addr: SocketAddr,

    /// Frontend dev server base URL; `None` serves the bundled components
    pub dev_server: Option<String>,

    /// Base URLs the render stream may fetch (`?url=`), besides the server itself
    pub allowed_upstreams: Vec<String>,

    /// Default display options
    pub render: RenderConfig,

    /// Pacing of the simulated token streams
    pub simulation: SimulationConfig,

    pub logging: LoggingConfig,

    /// Values that were invalid and replaced while loading
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            dev_server: None,
            allowed_upstreams: Vec::new(),
            render: RenderConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            warnings: Vec::new(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

/// The config file exists but can't be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid TOML for markstream")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub dev_server: Option<String>,
    pub allowed_upstreams: Option<Vec<String>>,
    pub render: Option<FileRender>,
    pub simulation: Option<FileSimulation>,
    pub logging: Option<FileLogging>,
}

/// Read and parse a config file; a missing file is an empty one
pub(crate) fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Get the config file path: ~/.config/markstream/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("markstream").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        // config is optional; a read-only home just means defaults
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load configuration: env vars > file > defaults
    pub fn load() -> Result<Self, ConfigError> {
        let file = match Self::config_path() {
            Some(path) => read_file_config(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self::from_sources(file, |name| std::env::var(name).ok()))
    }

    /// Configuration from the file at `path` alone, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_sources(read_file_config(path)?, |_| None))
    }

    /// Merge a parsed config file with variables looked up through `env`
    pub(crate) fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();

        let bind_addr = match env(ENV_BIND).or(file.bind_addr) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warnings.push(format!(
                    "invalid bind address {:?} ({}), using {}",
                    raw, e, DEFAULT_BIND
                ));
                default_bind_addr()
            }),
            None => default_bind_addr(),
        };

        let dev_server = env(ENV_DEV_SERVER)
            .or(file.dev_server)
            .filter(|url| !url.trim().is_empty());

        let allowed_upstreams = match env(ENV_ALLOWED_UPSTREAMS) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect(),
            None => file.allowed_upstreams.unwrap_or_default(),
        };

        let mut render = RenderConfig::from_file(file.render, &mut warnings);
        if let Some(theme) = env(ENV_THEME) {
            render.theme = crate::component::Theme::from_str(&theme);
        }

        let simulation = SimulationConfig::from_file(file.simulation, &mut warnings);

        // A log directory in the environment turns file logging on
        let mut logging = LoggingConfig::from_file(file.logging, &mut warnings);
        if let Some(dir) = env(ENV_LOG_DIR).filter(|dir| !dir.trim().is_empty()) {
            match logging.file.as_mut() {
                Some(log_file) => log_file.dir = PathBuf::from(dir),
                None => logging.file = Some(LogFile::in_dir(dir)),
            }
        }

        Self {
            bind_addr,
            dev_server,
            allowed_upstreams,
            render,
            simulation,
            logging,
            warnings,
        }
    }
}
