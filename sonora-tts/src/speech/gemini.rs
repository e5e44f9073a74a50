//! Gemini text-to-speech REST client
//!
//! Calls `models/{model}:generateContent` with an AUDIO response modality and
//! a prebuilt voice. The response carries base64 PCM (24 kHz mono, 16-bit
//! LE) in the first candidate's first inline-data part.
//!
//! Speaking-rate and pitch hints from the voice profile are NOT sent: the
//! API rejects them together with a prebuilt voice (INVALID_ARGUMENT).

use crate::error::{Error, Result};
use crate::speech::SpeechGenerator;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sonora_common::config::{TomlConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use sonora_common::VoiceProfile;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("sonora-tts/", env!("CARGO_PKG_VERSION"));

pub const MISSING_API_KEY: &str =
    "API_KEY is not set. Please ensure it is configured in your environment.";
pub const NO_AUDIO_DATA: &str = "No audio data received from the Gemini API.";

/// Connection settings for [`GeminiClient`]
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiSettings {
    /// Settings from a loaded config file plus the environment API key
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(text: &'a str, voice: &VoiceProfile) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![TextPart { text }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.voice_name.as_str(),
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

impl GenerateResponse {
    /// Base64 audio of the first candidate's first part
    fn audio_data(&self) -> Option<&str> {
        let part = self.candidates.first()?.content.as_ref()?.parts.first()?;
        let inline = part.inline_data.as_ref()?;
        if let Some(mime) = inline.mime_type.as_deref() {
            debug!(mime_type = mime, "Gemini inline audio");
        }
        inline.data.as_deref().filter(|data| !data.is_empty())
    }
}

/// Decode the audio payload of a raw `generateContent` response body
fn extract_audio(body: &str) -> Result<Vec<u8>> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::ExternalCall(format!("Parse error: {}", e)))?;

    let data = response
        .audio_data()
        .ok_or_else(|| Error::ExternalCall(NO_AUDIO_DATA.to_string()))?;

    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| Error::ExternalCall(format!("Parse error: invalid base64 audio: {}", e)))
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::ExternalCall(format!("Network error: {}", e)))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::ExternalCall(MISSING_API_KEY.to_string()))
    }
}

#[async_trait]
impl SpeechGenerator for GeminiClient {
    async fn generate_speech(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;
        let request = GenerateRequest::new(text, voice);

        debug!(
            model = %self.settings.model,
            voice = %voice.voice_name,
            chars = text.chars().count(),
            "Requesting speech from Gemini"
        );

        let response = self
            .http_client
            .post(self.settings.url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ExternalCall(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::ExternalCall(format!("Network error: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini API returned an error");
            return Err(Error::ExternalCall(format!(
                "API error {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let audio = extract_audio(&body)?;
        debug!(bytes = audio.len(), "Received Gemini audio");
        Ok(audio)
    }
}
