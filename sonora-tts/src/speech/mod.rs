//! Speech generation collaborators
//!
//! The studio only needs `text + voice -> raw PCM bytes`; the Gemini REST
//! client is the production implementation.

use crate::error::Result;
use async_trait::async_trait;
use sonora_common::VoiceProfile;
use std::sync::Arc;

pub mod gemini;

pub use gemini::{GeminiClient, GeminiSettings};

/// Turns text into raw 16-bit little-endian PCM
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Generate speech for `text` spoken by `voice`
    ///
    /// # Returns
    /// * `Ok(bytes)` - Raw PCM, possibly empty
    /// * `Err(Error::ExternalCall)` - Network, auth or API failure
    async fn generate_speech(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T> SpeechGenerator for Arc<T>
where
    T: SpeechGenerator + ?Sized,
{
    async fn generate_speech(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        (**self).generate_speech(text, voice).await
    }
}
