use crate::error::{CpuPulseError, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "cpupulse";

/// The filename for the configuration file.
const CONFIG_FILENAME: &str = "config.toml";

/// Default target process.
pub const DEFAULT_PROCESS_NAME: &str = "RainbowSix_DX11.exe";

/// Default time between mitigation cycles (5 minutes).
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Lower bound applied to the interval before it is used.
pub const MIN_INTERVAL_SECS: u64 = 1;

/// Longest accepted interval: one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

// ============================================================================
// Configuration
// ============================================================================

/// User-editable settings for the monitor.
///
/// Missing fields in a config file fall back to their defaults, so a
/// partial file still loads.
///
/// # Example
///
/// ```toml
/// process_name = "RainbowSix_DX11.exe"
/// interval_secs = 300
/// autostart = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Exact image name of the process to mitigate.
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Seconds between mitigation cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Whether cpupulse is registered to start at logon.
    #[serde(default)]
    pub autostart: bool,
}

fn default_process_name() -> String {
    DEFAULT_PROCESS_NAME.to_string()
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            autostart: false,
        }
    }
}

impl Config {
    /// The cycle interval, clamped to `MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
    }

    /// Set a single value by key, parsing it from a string.
    ///
    /// Valid keys: `process_name`, `interval_secs` (alias `interval`),
    /// `autostart`. The result is not validated; see [`validate_config`].
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "process_name" => self.process_name = value.trim().to_string(),
            "interval_secs" | "interval" => {
                self.interval_secs = value.trim().parse().map_err(|_| {
                    CpuPulseError::Config(format!(
                        "Invalid interval '{}': expected a whole number of seconds",
                        value
                    ))
                })?;
            }
            "autostart" => {
                self.autostart = parse_bool(value).ok_or_else(|| {
                    CpuPulseError::Config(format!(
                        "Invalid value '{}' for autostart: expected true or false",
                        value
                    ))
                })?;
            }
            other => {
                return Err(CpuPulseError::Config(format!(
                    "Unknown config key '{}'. Valid keys: process_name, interval_secs, autostart",
                    other
                )))
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Config Validation
// ============================================================================

use std::error::Error;
use std::fmt;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The process name is empty or only whitespace.
    EmptyProcessName,
    /// The interval is zero.
    ZeroInterval,
    /// The interval exceeds `MAX_INTERVAL_SECS`.
    IntervalTooLong,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyProcessName => write!(f, "Process name must not be empty"),
            ConfigError::ZeroInterval => {
                write!(f, "Interval must be at least {} second", MIN_INTERVAL_SECS)
            }
            ConfigError::IntervalTooLong => {
                write!(f, "Interval must be at most {} seconds", MAX_INTERVAL_SECS)
            }
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for CpuPulseError {
    fn from(e: ConfigError) -> Self {
        CpuPulseError::Config(e.to_string())
    }
}

/// Validate a configuration before it is saved or used.
///
/// # Example
///
/// ```
/// use cpupulse::config::{Config, validate_config};
///
/// assert!(validate_config(&Config::default()).is_ok());
///
/// let invalid = Config {
///     interval_secs: 0,
///     ..Default::default()
/// };
/// assert!(validate_config(&invalid).is_err());
/// ```
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if config.process_name.trim().is_empty() {
        return Err(ConfigError::EmptyProcessName);
    }
    if config.interval_secs < MIN_INTERVAL_SECS {
        return Err(ConfigError::ZeroInterval);
    }
    if config.interval_secs > MAX_INTERVAL_SECS {
        return Err(ConfigError::IntervalTooLong);
    }
    Ok(())
}

// ============================================================================
// Config Store
// ============================================================================

/// Source of truth for the current configuration.
///
/// `load` never fails: a missing or unreadable config yields the defaults.
/// Readers always see a complete value, never a partially written one.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Config;

    fn save(&self, config: &Config) -> std::result::Result<(), StoreError>;
}

/// Config kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: RwLock<Option<Config>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: RwLock::new(Some(config)),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_default()
    }

    fn save(&self, config: &Config) -> std::result::Result<(), StoreError> {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(())
    }
}

/// Config persisted as TOML, by default at `~/.config/cpupulse/config.toml`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store at the default location.
    pub fn new() -> std::result::Result<Self, StoreError> {
        Ok(Self::at(config_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
            Err(e) => {
                log::warn!(
                    "Failed to read config file at {:?}: {}; using defaults",
                    self.path,
                    e
                );
                return Config::default();
            }
        };

        let config: Config = match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Failed to parse config file at {:?}: {}; using defaults",
                    self.path,
                    e
                );
                return Config::default();
            }
        };

        if let Err(e) = validate_config(&config) {
            log::warn!("Invalid config at {:?}: {}; using defaults", self.path, e);
            return Config::default();
        }

        config
    }

    fn save(&self, config: &Config) -> std::result::Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(write_err)?;

        // Write to a sibling temp file then rename over the target, so a
        // concurrent `load` sees either the old file or the new one.
        let tmp_path = self.path.with_extension("toml.tmp");
        let content = generate_config_with_comments(config)?;
        let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// Generate config file content with explanatory comments.
fn generate_config_with_comments(config: &Config) -> std::result::Result<String, StoreError> {
    // Let toml do the quoting so names with quotes or backslashes survive
    #[derive(Serialize)]
    struct ProcessNameLine<'a> {
        process_name: &'a str,
    }
    let process_name_line = toml::to_string(&ProcessNameLine {
        process_name: &config.process_name,
    })
    .map_err(|e| StoreError::Serialize(e.to_string()))?;

    Ok(format!(
        r#"# cpupulse configuration

# Exact image name of the process to mitigate (case-sensitive)
{}
# Seconds between mitigation cycles ({} to {})
interval_secs = {}

# Start cpupulse automatically at logon
autostart = {}
"#,
        process_name_line, MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, config.interval_secs, config.autostart
    ))
}

// ============================================================================
// Config Directory
// ============================================================================

/// Get the cpupulse config directory path (~/.config/cpupulse/).
///
/// Returns the path to the config directory. Does not create the directory.
pub fn config_dir() -> std::result::Result<PathBuf, StoreError> {
    let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Get the path to the config file.
pub fn config_path() -> std::result::Result<PathBuf, StoreError> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}
