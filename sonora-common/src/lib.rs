//! # Sonora Common Library
//!
//! Shared code for the Sonora text-to-speech studio including:
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - The static voice catalog
//! - Session event types broadcast to front-ends
//! - The common error type

pub mod config;
pub mod error;
pub mod events;
pub mod voices;

pub use error::{Error, Result};
pub use voices::{VoiceName, VoiceProfile, VOICES};
