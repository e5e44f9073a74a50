//! # Sonora TTS
//!
//! Text-to-speech front-end core: turns raw 16-bit PCM from a speech API into
//! playable audio and a downloadable WAV file.
//!
//! **Pipeline:** [`speech::SpeechGenerator`] -> [`audio::pcm::decode`] ->
//! [`audio::wav::encode`] -> [`resources::ResourceSlot`] +
//! [`playback::PlaybackController`] on an [`audio::OutputContext`].
//!
//! [`studio::Studio`] orchestrates one session and exposes UI-facing state.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod resources;
pub mod speech;
pub mod state;
pub mod studio;

pub use error::{Error, Result};
pub use state::{SharedState, UiState};
pub use studio::{GenerationReport, Studio, StudioOptions};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
