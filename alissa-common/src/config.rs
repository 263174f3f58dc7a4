//! Configuration loading for the Alissa tooling
//!
//! Connection settings are resolved per field with the priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//!
//! A missing default TOML file is not an error: the tool warns and continues
//! with built-in defaults, so a fully CLI/ENV driven invocation works.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable names for each connection field
pub const ENV_BASE_URI: &str = "ALISSA_BASE_URI";
pub const ENV_CLIENT_ID: &str = "ALISSA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ALISSA_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "ALISSA_USERNAME";
pub const ENV_PASSWORD: &str = "ALISSA_PASSWORD";

/// Application folder name under the platform config directory
const CONFIG_DIR_NAME: &str = "alissa-review";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file contents
///
/// Every section is optional; absent sections fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[connection]` section; each field may be overridden by ENV or CLI
#[derive(Clone, Default, Deserialize)]
pub struct ConnectionSection {
    pub base_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSection")
            .field("base_uri", &self.base_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// `[export]` section: polling bounds for asynchronous variant exports
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    /// Length of one delay unit in milliseconds
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// Growth factor applied to the delay after each not-ready reply
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single delay, in time units
    #[serde(default = "default_max_delay_units")]
    pub max_delay_units: f64,

    /// Maximum export fetch attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Overall wall-clock budget per export, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Analyses with more molecular variants than this are not exported
    #[serde(default = "default_large_analysis_threshold")]
    pub large_analysis_threshold: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            time_unit_ms: default_time_unit_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_units: default_max_delay_units(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            large_analysis_threshold: default_large_analysis_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_time_unit_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_delay_units() -> f64 {
    300.0
}

fn default_max_attempts() -> u32 {
    720
}

fn default_timeout_secs() -> u64 {
    6 * 60 * 60
}

fn default_large_analysis_threshold() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default config file location: `<config_dir>/alissa-review/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file found; built-in defaults in effect
    Defaults { searched: Option<PathBuf> },
}

/// Configuration plus its origin
///
/// Loading happens before logging is initialized (the log level lives in the
/// file), so the origin is returned for the caller to report.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    /// Log where configuration came from
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
            ConfigSource::Defaults { searched } => warn!(
                searched = ?searched,
                "No config file found, using defaults and environment"
            ),
        }
    }
}

/// Load the TOML configuration
///
/// An explicitly given path must exist. When no path is given the platform
/// default is tried; if it is absent the built-in defaults are used.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            searched => {
                return Ok(LoadedConfig {
                    config: TomlConfig::default(),
                    source: ConfigSource::Defaults { searched },
                });
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path),
    })
}

/// Connection settings supplied on the command line
#[derive(Clone, Default)]
pub struct ConnectionOverrides {
    pub base_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Fully resolved connection settings for the Alissa public API
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server base URI, without trailing slash
    pub base_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_uri", &self.base_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl ConnectionConfig {
    /// Resolve every field from CLI, then environment, then TOML
    pub fn resolve(cli: &ConnectionOverrides, toml: &ConnectionSection) -> Result<Self> {
        let base_uri = resolve_field("base_uri", &cli.base_uri, ENV_BASE_URI, &toml.base_uri)?;

        Ok(Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            client_id: resolve_field("client_id", &cli.client_id, ENV_CLIENT_ID, &toml.client_id)?,
            client_secret: resolve_field(
                "client_secret",
                &cli.client_secret,
                ENV_CLIENT_SECRET,
                &toml.client_secret,
            )?,
            username: resolve_field("username", &cli.username, ENV_USERNAME, &toml.username)?,
            password: resolve_field("password", &cli.password, ENV_PASSWORD, &toml.password)?,
        })
    }
}

fn resolve_field(
    name: &str,
    cli: &Option<String>,
    env_var: &str,
    toml: &Option<String>,
) -> Result<String> {
    let env = std::env::var(env_var).ok();

    let value = [cli.as_deref(), env.as_deref(), toml.as_deref()]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .map(str::to_string);

    value.ok_or_else(|| {
        Error::Config(format!(
            "Connection setting '{}' not configured. Use --{}, {} or [connection].{} in {}",
            name,
            name.replace('_', "-"),
            env_var,
            name,
            CONFIG_FILE_NAME
        ))
    })
}
