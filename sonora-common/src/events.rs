//! Session event types
//!
//! Events describe every observable transition of a studio session. They are
//! broadcast to front-ends (terminal UI, logs) and serialize with a `type`
//! tag so they can be emitted as JSON lines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Studio session events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A speech request passed validation and is about to be sent
    GenerationStarted {
        /// Id shared by all events of this generation
        generation_id: Uuid,
        /// Catalog id of the selected voice
        voice_id: String,
        /// Input length in characters
        char_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio was decoded, encoded and handed to playback
    GenerationCompleted {
        generation_id: Uuid,
        /// Frames per channel
        frame_count: usize,
        sample_rate: u32,
        /// Duration in milliseconds
        duration_ms: u64,
        /// Size of the encoded WAV file
        wav_bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Generation failed; `message` is what the user sees
    GenerationFailed {
        generation_id: Option<Uuid>,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A playback voice started
    PlaybackStarted {
        frame_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active playback voice was stopped before finishing
    PlaybackStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A downloadable WAV resource became available
    ResourceCreated {
        url: String,
        size_bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The downloadable WAV resource was released
    ResourceReleased {
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The WAV resource was copied to a user-chosen location
    AudioSaved {
        path: PathBuf,
        size_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The studio was torn down
    SessionClosed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::GenerationStarted { .. } => "GenerationStarted",
            SessionEvent::GenerationCompleted { .. } => "GenerationCompleted",
            SessionEvent::GenerationFailed { .. } => "GenerationFailed",
            SessionEvent::PlaybackStarted { .. } => "PlaybackStarted",
            SessionEvent::PlaybackStopped { .. } => "PlaybackStopped",
            SessionEvent::ResourceCreated { .. } => "ResourceCreated",
            SessionEvent::ResourceReleased { .. } => "ResourceReleased",
            SessionEvent::AudioSaved { .. } => "AudioSaved",
            SessionEvent::SessionClosed { .. } => "SessionClosed",
        }
    }
}
