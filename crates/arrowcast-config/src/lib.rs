//! Shared configuration for arrowcast tools.
//!
//! TOML profiles naming a bracket server, merged with `ARROWCAST_*`
//! environment variables, and translated to `arrowcast_core::ReplicaConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arrowcast_core::config::{DEFAULT_PUSH_PATH, DEFAULT_TEST_PREFIX};
use arrowcast_core::{ReconnectPolicy, ReplicaConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Full snapshot refresh interval in seconds. 0 disables it.
    #[serde(default)]
    pub refresh_interval: u64,

    #[serde(default = "default_true")]
    pub websocket: bool,

    /// Name prefix of production tournaments.
    #[serde(default = "default_test_prefix")]
    pub test_prefix: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            refresh_interval: 0,
            websocket: true,
            test_prefix: default_test_prefix(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_test_prefix() -> String {
    DEFAULT_TEST_PREFIX.into()
}

/// A named server profile. Unset fields fall back to [`Defaults`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://drunkenfall.com").
    pub server: String,

    /// Push channel path. Default: `/api/auto-updater`.
    pub push_path: Option<String>,

    pub timeout: Option<u64>,

    pub refresh_interval: Option<u64>,

    pub websocket: Option<bool>,

    /// First reconnect delay in milliseconds.
    pub reconnect_initial_ms: Option<u64>,

    /// Backoff ceiling in milliseconds.
    pub reconnect_max_ms: Option<u64>,

    /// Give up after this many failed reconnects. Unset retries forever.
    pub max_retries: Option<u32>,

    pub test_prefix: Option<String>,
}

impl Profile {
    /// Validate the profile and build a `ReplicaConfig`.
    pub fn to_replica_config(&self, defaults: &Defaults) -> Result<ReplicaConfig, ConfigError> {
        let url: url::Url = self.server.parse().map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", self.server),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("expected an http(s) URL, got '{}'", url.scheme()),
            });
        }

        let push_path = self
            .push_path
            .clone()
            .unwrap_or_else(|| DEFAULT_PUSH_PATH.into());
        if !push_path.starts_with('/') {
            return Err(ConfigError::Validation {
                field: "push_path".into(),
                reason: format!("must start with '/', got '{push_path}'"),
            });
        }

        let mut reconnect = ReconnectPolicy::default();
        if let Some(ms) = self.reconnect_initial_ms {
            reconnect.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reconnect_max_ms {
            reconnect.max_delay = Duration::from_millis(ms);
        }
        if reconnect.max_delay < reconnect.initial_delay {
            return Err(ConfigError::Validation {
                field: "reconnect_max_ms".into(),
                reason: "must not be below reconnect_initial_ms".into(),
            });
        }
        reconnect.max_retries = self.max_retries;

        let mut config = ReplicaConfig::new(url);
        config.push_path = push_path;
        config.timeout = Duration::from_secs(self.timeout.unwrap_or(defaults.timeout));
        config.refresh_interval_secs = self.refresh_interval.unwrap_or(defaults.refresh_interval);
        config.websocket_enabled = self.websocket.unwrap_or(defaults.websocket);
        config.reconnect = reconnect;
        config.test_prefix = self
            .test_prefix
            .clone()
            .unwrap_or_else(|| defaults.test_prefix.clone());
        Ok(config)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "arrowcast", "arrowcast").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("arrowcast");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file yields the
/// defaults.
///
/// Environment keys nest with a double underscore:
/// `ARROWCAST_PROFILES__LOCAL__SERVER=http://localhost:8080`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ARROWCAST_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

/// Render config as the TOML that `save_config` would write.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}
