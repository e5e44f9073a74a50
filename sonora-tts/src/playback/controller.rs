//! Single-voice playback controller
//!
//! Starting playback always stops the previous voice first, so at most one
//! voice started through a controller is audible at any instant.

use crate::audio::{ContextState, OutputContext, SampleBuffer, VoiceHandle, CONTEXT_UNAVAILABLE};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Tracks the one active playback voice
#[derive(Debug, Default)]
pub struct PlaybackController {
    current: Option<VoiceHandle>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play `buffer` from its start, replacing any active voice.
    ///
    /// # Errors
    /// `Error::Initialization` if the context is closed. The previous voice
    /// is left untouched in that case.
    pub fn play<C>(&mut self, ctx: &C, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle>
    where
        C: OutputContext + ?Sized,
    {
        if ctx.state() == ContextState::Closed {
            return Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string()));
        }

        self.stop();

        let handle = ctx.start_voice(buffer)?;
        debug!(
            voice_id = handle.id(),
            frames = handle.frame_count(),
            "Playback started"
        );
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Stop the active voice. Returns true if something was audible.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                let was_audible = handle.stop();
                if was_audible {
                    debug!(voice_id = handle.id(), "Playback stopped");
                }
                was_audible
            }
            None => false,
        }
    }

    /// A voice is active and has not reached its end
    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(VoiceHandle::is_active)
    }

    /// Handle of the most recently started voice
    pub fn current(&self) -> Option<&VoiceHandle> {
        self.current.as_ref()
    }
}
