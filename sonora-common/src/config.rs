//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a small TOML file. Every field has a
//! built-in default, so a missing file never prevents startup.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SONORA_CONFIG` environment variable
//! 3. User config directory (`~/.config/sonora/config.toml` on Linux)
//! 4. System config (`/etc/sonora/config.toml`, Linux only)
//! 5. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SONORA_CONFIG";

/// Environment variables checked for the Gemini API key, in priority order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Speech model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Gemini REST API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum accepted input length in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 500;

/// The speech API returns 24 kHz mono PCM; the output context is opened at
/// the same rate so no resampling step is needed.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Channel count of the raw PCM returned by the speech API
pub const DEFAULT_CHANNELS: u16 = 1;

/// Filename offered for downloads
pub const DEFAULT_OUTPUT_FILE: &str = "gemini_speech.wav";

/// MIME type of the downloadable resource
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Bootstrap configuration loaded from TOML file
///
/// All fields are optional in the file; omitted fields take their
/// compiled defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Gemini API key (environment variables take precedence)
    pub api_key: Option<String>,

    /// Speech model name
    pub model: String,

    /// API base URL
    pub endpoint: String,

    /// Maximum input length in characters
    pub max_text_length: usize,

    /// Sample rate of the raw PCM and of the output context (Hz)
    pub sample_rate: u32,

    /// Channel count of the raw PCM
    pub channels: u16,

    /// Default download target
    pub output_file: PathBuf,

    /// Timeout for a single speech request
    pub request_timeout_secs: u64,

    /// Output device name (None = system default)
    pub audio_device: Option<String>,

    /// Write WAV payloads channel-by-channel instead of interleaved
    pub planar_wav: bool,

    /// Voice catalog id selected at startup (None = first catalog entry)
    pub default_voice: Option<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            request_timeout_secs: 60,
            audio_device: None,
            planar_wav: false,
            default_voice: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the audio pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be at least 1".to_string()));
        }
        if self.max_text_length == 0 {
            return Err(Error::Config("max_text_length must be positive".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the API key: environment first, then the TOML value.
    ///
    /// Blank values are treated as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .chain(self.api_key.clone())
            .find(|key| !key.trim().is_empty())
    }

    /// Request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Config file resolver implementing the priority order in the module docs
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver with an optional command-line path
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Determine which config file to read, if any
    ///
    /// Explicit paths (CLI, environment) are returned even when they do not
    /// exist so the caller can report them; search locations are only
    /// returned when present on disk.
    pub fn config_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3/4: Platform search locations
        default_config_candidates()
            .into_iter()
            .find(|candidate| candidate.exists())
    }

    /// Load the configuration
    ///
    /// A missing or unreadable file logs a warning and yields defaults.
    /// A file that exists but fails to parse or validate is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        let Some(path) = self.config_path() else {
            debug!("No config file found, using compiled defaults");
            return Ok(TomlConfig::default());
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Config file not readable, using compiled defaults"
                );
                return Ok(TomlConfig::default());
            }
        };

        let config = TomlConfig::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Platform-specific config file search locations, in priority order
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("sonora").join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/sonora/config.toml"));
    }

    candidates
}
