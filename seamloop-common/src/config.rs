//! Configuration loading and config file resolution
//!
//! Seamloop reads a small TOML bootstrap file. Everything in it is optional:
//! a missing file produces a warning and built-in defaults, a malformed file
//! is a configuration error.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`SEAMLOOP_CONFIG`)
//! 3. User config directory (`<config dir>/seamloop/config.toml`)
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SEAMLOOP_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Output device and stream settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Loop window applied at startup
    #[serde(default, rename = "loop")]
    pub loop_window: LoopConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output device and stream settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,

    /// Audio buffer size in frames (None = device default)
    #[serde(default)]
    pub buffer_size: Option<u32>,

    /// Master volume, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: None,
            buffer_size: None,
            volume: default_volume(),
        }
    }
}

/// Loop window settings, in seconds
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoopConfig {
    /// Start looping as soon as playback begins
    #[serde(default)]
    pub enabled: bool,

    /// Loop start time (inclusive)
    #[serde(default)]
    pub start_seconds: Option<f64>,

    /// Loop end time (exclusive)
    #[serde(default)]
    pub end_seconds: Option<f64>,
}

impl LoopConfig {
    /// Validated `(start, end)` bounds, or `None` when no bounds are configured.
    ///
    /// # Errors
    /// - Only one of the two bounds is set
    /// - A bound is negative or not finite
    /// - End is not after start
    pub fn bounds(&self) -> Result<Option<(f64, f64)>> {
        let (start, end) = match (self.start_seconds, self.end_seconds) {
            (None, None) => return Ok(None),
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(Error::Config(
                    "loop start and loop end must be given together".to_string(),
                ))
            }
        };

        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(Error::Config(format!(
                "Invalid loop bounds: start={}s, end={}s",
                start, end
            )));
        }

        if end <= start {
            return Err(Error::Config(format!(
                "Loop end ({}s) must be after loop start ({}s)",
                end, start
            )));
        }

        Ok(Some((start, end)))
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

fn default_volume() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        if !(0.0..=1.0).contains(&config.playback.volume) {
            return Err(Error::Config(format!(
                "Volume {} is outside 0.0..=1.0",
                config.playback.volume
            )));
        }
        config.loop_window.bounds()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults when there is no file.
    ///
    /// A path that does not exist logs a warning and yields defaults; a file
    /// that exists but cannot be parsed is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No config file, using built-in defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let config = Self::load(path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Resolve which config file to use.
///
/// Returns the first of: the CLI argument, the environment variable, or the
/// default user config file if it exists. `None` means built-in defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location: `<config dir>/seamloop/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("seamloop").join("config.toml"))
}
