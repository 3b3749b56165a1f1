//! # vdi-config
//!
//! Configuration management for the vdi preload layer.
//!
//! Loads configuration from:
//! 1. Built-in defaults
//! 2. `~/.vdi/config.toml` (global, read once per process)
//! 3. Environment variables (highest priority, re-read on every call)

pub mod expand;
pub mod logging;
pub mod path;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

pub use expand::expand_shell_vars;
pub use logging::init_logging;

pub const ENV_LOG_DIR: &str = "VDI_LOG_DIR";
pub const ENV_LOG_FILE_PREFIX: &str = "VDI_LOG_FILE_PREFIX";
pub const ENV_LOG_FILE_SUFFIX: &str = "VDI_LOG_FILE_SUFFIX";
pub const ENV_LOG_FORMAT: &str = "VDI_LOG_FORMAT";
pub const ENV_LOG_DEBUG_LEVEL: &str = "VDI_LOG_DEBUG_LEVEL";
pub const ENV_REMOTE_FETCH: &str = "VDI_REMOTE_FETCH";
pub const ENV_DOWNLOAD_BASE: &str = "VDI_DOWNLOAD_BASE";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "VDI_DOWNLOAD_TIMEOUT";

pub const DEFAULT_LOG_DIR: &str = "${HOME}/.vdi/logs";
pub const DEFAULT_LOG_FILE_PREFIX: &str = "vdi_log.";

/// Config file contents, loaded lazily on first use.
static FILE_CONFIG: Lazy<Config> = Lazy::new(|| match Config::load_file() {
    Ok(config) => config,
    Err(e) => {
        warn!("ignoring unreadable config file: {}", e);
        Config::default()
    }
});

/// Current effective configuration: file values overlaid with the
/// environment as it is right now.
pub fn config() -> Config {
    let mut config = FILE_CONFIG.clone();
    config.apply_env_overrides();
    config
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub fetch: FetchConfig,
}

impl Config {
    /// Load the global config file, falling back to defaults when absent.
    pub fn load_file() -> Result<Self, ConfigError> {
        match Self::global_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading global config from {:?}", path);
                let contents = std::fs::read_to_string(&path)?;
                Ok(toml::from_str(&contents)?)
            }
            _ => Ok(Config::default()),
        }
    }

    /// Global config path: ~/.vdi/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".vdi/config.toml"))
    }

    /// Apply environment variable overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log.dir = dir;
        }
        if let Some(prefix) = lookup(ENV_LOG_FILE_PREFIX) {
            self.log.file_prefix = prefix;
        }
        if let Some(suffix) = lookup(ENV_LOG_FILE_SUFFIX) {
            self.log.file_suffix = suffix;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            match format.trim().to_ascii_lowercase().as_str() {
                "minimal" => self.log.format = LogFormat::Minimal,
                "full" => self.log.format = LogFormat::Full,
                other => warn!("unknown {} value '{}'", ENV_LOG_FORMAT, other),
            }
        }
        if let Some(level) = lookup(ENV_LOG_DEBUG_LEVEL) {
            self.log.debug_level = parse_debug_level(&level);
        }
        if let Some(enabled) = lookup(ENV_REMOTE_FETCH) {
            self.fetch.enabled = !matches!(
                enabled.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(base) = lookup(ENV_DOWNLOAD_BASE) {
            self.fetch.download_base = Some(base);
        }
        if let Some(timeout) = lookup(ENV_DOWNLOAD_TIMEOUT) {
            self.fetch.timeout_secs = timeout.trim().parse().ok().filter(|secs| *secs > 0);
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Config::default())
    }
}

/// Integer parsing with `atoi` leniency: leading digits count, junk is zero.
fn parse_debug_level(raw: &str) -> u8 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<u32>()
        .map(|v| v.min(u8::MAX as u32) as u8)
        .unwrap_or(0)
}

/// Which fields a log record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Full process/host context followed by the call.
    #[default]
    Full,
    /// Only `func-name [args...]`.
    Minimal,
}

/// Audit log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory, subject to shell-style expansion
    pub dir: String,
    /// Log filename prefix, subject to shell-style expansion
    pub file_prefix: String,
    /// Appended after the pid
    pub file_suffix: String,
    pub format: LogFormat,
    /// Stderr diagnostic verbosity
    pub debug_level: u8,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_LOG_DIR.to_string(),
            file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            file_suffix: String::new(),
            format: LogFormat::Full,
            debug_level: 0,
        }
    }
}

impl LogConfig {
    /// Expanded log directory.
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(expand_shell_vars(&self.dir))
    }

    /// `{log_dir}/{prefix}{pid}{suffix}`
    pub fn log_path(&self, pid: i32) -> PathBuf {
        PathBuf::from(format!(
            "{}/{}{}{}",
            expand_shell_vars(&self.dir),
            expand_shell_vars(&self.file_prefix),
            pid,
            self.file_suffix
        ))
    }
}

/// Remote fetch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Rewrite URL path arguments to downloaded local copies
    pub enabled: bool,
    /// Download directory; `/tmp/{username}/vdi/downloads` when unset
    pub download_base: Option<String>,
    /// Transfer timeout; `None` blocks indefinitely
    pub timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            download_base: None,
            timeout_secs: None,
        }
    }
}

impl FetchConfig {
    /// Download directory for the given user.
    pub fn download_base(&self, username: &str) -> PathBuf {
        match &self.download_base {
            Some(base) => PathBuf::from(expand_shell_vars(base)),
            None => PathBuf::from(format!("/tmp/{}/vdi/downloads", username)),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
