//! Configuration for sonora-tts
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--config`, `--device`)
//! 2. Environment variables (`SONORA_CONFIG`, `SONORA_AUDIO_DEVICE`,
//!    `GEMINI_API_KEY` / `API_KEY`)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::audio::{ChannelLayout, WavOptions};
use crate::error::Result;
use crate::speech::GeminiSettings;
use crate::studio::StudioOptions;
use sonora_common::config::{ConfigResolver, TomlConfig};
use sonora_common::voices::default_voice;
use std::path::PathBuf;
use tracing::warn;

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub toml: TomlConfig,
    /// Output device name (`None` = system default)
    pub audio_device: Option<String>,
    /// Path the TOML was read from, if one was found
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load and validate configuration.
    ///
    /// A missing config file falls back to defaults; a malformed or invalid
    /// one is an error.
    pub fn resolve(cli_config: Option<PathBuf>, cli_device: Option<String>) -> Result<Self> {
        let resolver = ConfigResolver::new(cli_config);
        let source = resolver.config_path();
        let toml = resolver.load()?;
        toml.validate()?;

        let audio_device = cli_device.or_else(|| toml.audio_device.clone());

        if toml.resolve_api_key().is_none() {
            warn!("No Gemini API key configured; speech generation will fail");
        }

        Ok(Self {
            toml,
            audio_device,
            source,
        })
    }

    /// Configuration from built-in defaults only
    pub fn defaults() -> Self {
        Self {
            toml: TomlConfig::default(),
            audio_device: None,
            source: None,
        }
    }

    pub fn studio_options(&self) -> StudioOptions {
        let voice_id = self
            .toml
            .default_voice
            .clone()
            .unwrap_or_else(|| default_voice().id.to_string());
        let layout = if self.toml.planar_wav {
            ChannelLayout::Planar
        } else {
            ChannelLayout::Interleaved
        };

        StudioOptions {
            sample_rate: self.toml.sample_rate,
            channels: self.toml.channels,
            max_text_length: self.toml.max_text_length,
            wav: WavOptions {
                layout,
                ..WavOptions::default()
            },
            resource_dir: None,
            output_file: self.toml.output_file.clone(),
            voice_id,
        }
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings::from_config(&self.toml)
    }

    /// Default tracing filter directive
    pub fn log_filter(&self) -> String {
        let level = &self.toml.logging.level;
        format!("sonora_tts={},sonora_common={}", level, level)
    }
}
