//! Deployment settings: listen address, CORS, headless mode, data location.
//!
//! Resolution order: built-in defaults, then an optional YAML file, then
//! environment variables. `PORT` is honoured for platforms that inject it.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::data::loader::DEFAULT_DATA_DIR;

pub const DEFAULT_CONFIG_PATH: &str = "covid-explorer.yaml";
pub const DEFAULT_STATIC_DIR: &str = "frontend/dist";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;

pub const ENV_CONFIG: &str = "COVID_EXPLORER_CONFIG";
pub const ENV_HOST: &str = "COVID_EXPLORER_HOST";
pub const ENV_PORT: &str = "COVID_EXPLORER_PORT";
pub const ENV_PLATFORM_PORT: &str = "PORT";
pub const ENV_CORS: &str = "COVID_EXPLORER_CORS";
pub const ENV_HEADLESS: &str = "COVID_EXPLORER_HEADLESS";
pub const ENV_DATA_DIR: &str = "COVID_EXPLORER_DATA_DIR";
pub const ENV_STATIC_DIR: &str = "COVID_EXPLORER_STATIC_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin requests to the API.
    pub cors: bool,
    /// Serve only the JSON API, no bundled page.
    pub headless: bool,
    pub data_dir: PathBuf,
    /// Built frontend served for unmatched GETs when the directory exists.
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors: false,
            headless: false,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl AppConfig {
    /// Load from the process environment and, if present, the YAML file named
    /// by `COVID_EXPLORER_CONFIG` (or `covid-explorer.yaml`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let explicit = lookup(ENV_CONFIG);
        let path = explicit
            .as_deref()
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

        let mut config = if explicit.is_some() || path.is_file() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Overlay environment variables. `COVID_EXPLORER_PORT` wins over `PORT`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        for key in [ENV_PLATFORM_PORT, ENV_PORT] {
            if let Some(raw) = lookup(key) {
                self.port = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key,
                    value: raw.clone(),
                    reason: "expected a port number between 0 and 65535",
                })?;
            }
        }
        if let Some(raw) = lookup(ENV_CORS) {
            self.cors = parse_flag(ENV_CORS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.headless = parse_flag(ENV_HEADLESS, &raw)?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            self.static_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: ENV_HOST,
            value: self.host.clone(),
            reason: "expected an IP address",
        })
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected true/false",
        }),
    }
}
