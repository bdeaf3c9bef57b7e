use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::{LogFormat, DEFAULT_FILTER};

pub const DEFAULT_DB_PATH: &str = ".tpm/state.sqlite";
pub const DEFAULT_CONFIG_PATH: &str = "tpm.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub filter: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Toml { path: PathBuf, source: toml::de::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => {
                write!(f, "invalid config TOML in {}: {}", path.display(), source)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
        }
    }
}

impl ConfigFile {
    /// A missing file is not an error; it yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&raw).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// Explicit values from flags or the environment; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<String>,
    pub log_filter: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: String,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn resolve(file: ConfigFile, overrides: Overrides) -> Self {
        Self {
            db_path: overrides
                .db_path
                .or(file.database.path)
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_filter: overrides
                .log_filter
                .or(file.logging.filter)
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            log_format: overrides
                .log_format
                .or(file.logging.format)
                .unwrap_or_default(),
        }
    }
}
