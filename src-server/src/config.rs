//! Server configuration
//!
//! Defaults, then an optional TOML file, then `KANBAN_*` environment
//! variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "KANBAN_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("invalid config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// SQLite file, `:memory:` for a throwaway database
    pub db_path: PathBuf,
    /// Attachment blobs
    pub blob_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Per-channel broadcast buffer; slower subscribers are told they lagged
    pub channel_capacity: usize,
    pub max_attachment_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: PathBuf::from("kanban.db"),
            blob_dir: PathBuf::from("blobs"),
            log_dir: PathBuf::from("logs"),
            channel_capacity: 256,
            max_attachment_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Full startup resolution: file from `args`/`KANBAN_CONFIG`, then env.
    pub fn load(args: &[String]) -> Result<Self, ConfigError> {
        let path = args
            .get(1)
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.merge_with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Missing keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Apply `KANBAN_*` overrides read through `lookup`.
    pub fn merge_with_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("KANBAN_BIND") {
            self.bind = parse("KANBAN_BIND", value)?;
        }
        if let Some(value) = lookup("KANBAN_DB_PATH") {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("KANBAN_BLOB_DIR") {
            self.blob_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("KANBAN_LOG_DIR") {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("KANBAN_CHANNEL_CAPACITY") {
            self.channel_capacity = parse("KANBAN_CHANNEL_CAPACITY", value)?;
        }
        if let Some(value) = lookup("KANBAN_MAX_ATTACHMENT_BYTES") {
            self.max_attachment_bytes = parse("KANBAN_MAX_ATTACHMENT_BYTES", value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "channel_capacity",
                value: "0".to_string(),
            });
        }
        if self.max_attachment_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_attachment_bytes",
                value: "0".to_string(),
            });
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path",
                value: String::new(),
            });
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
