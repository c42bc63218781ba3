//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `WISHTREE_*` environment variables, then `PORT`.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rate_limit::RateLimitConfig;

/// Config file read when `WISHTREE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "wishtree.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "WISHTREE_CONFIG";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory holding `index.html` and the page assets
    pub static_dir: PathBuf,
    /// Default filter directive; `RUST_LOG` takes precedence
    pub log_level: String,
    pub log_format: LogFormat,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: PathBuf::from("wishes.db"),
            static_dir: PathBuf::from("static"),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path, std::env::var("PORT").ok().as_deref())
    }

    /// Load configuration from `path` (optional) with an explicit `PORT` value
    pub fn load_from(path: &str, port: Option<&str>) -> Result<Self, ConfigError> {
        let port = port
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::Message(format!("invalid PORT {raw:?}: {e}")))
            })
            .transpose()?;

        Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("WISHTREE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("port", port.map(i64::from))?
            .build()?
            .try_deserialize()
    }

    /// Address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
