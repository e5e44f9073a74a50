//! Device-less output context
//!
//! Behaves like a real context (suspend/resume/close, voice lifecycle) but
//! only renders when [`HeadlessContext::advance`] is called. Used for
//! `--no-play` runs and anywhere audio hardware is unavailable.

use crate::audio::context::{ContextState, OutputContext, CONTEXT_UNAVAILABLE};
use crate::audio::{SampleBuffer, VoiceHandle, VoiceMixer};
use crate::error::{Error, Result};
use crate::lock;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Output context without a device
pub struct HeadlessContext {
    sample_rate: u32,
    channels: usize,
    state: Mutex<ContextState>,
    mixer: Mutex<VoiceMixer>,
}

impl HeadlessContext {
    /// Running mono context at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, 1, ContextState::Running)
    }

    /// Context starting suspended, as an autoplay-gated device would
    pub fn suspended(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, 1, ContextState::Suspended)
    }

    /// Context with explicit channel count and initial state
    pub fn with_state(sample_rate: u32, channels: usize, state: ContextState) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            state: Mutex::new(state),
            mixer: Mutex::new(VoiceMixer::new(sample_rate)),
        }
    }

    /// Output channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Render `frames` frames of interleaved output.
    ///
    /// Returns an empty Vec when the context is not running: a suspended
    /// context does not advance time.
    pub fn advance(&self, frames: usize) -> Vec<f32> {
        if *lock(&self.state) != ContextState::Running {
            return Vec::new();
        }
        let mut out = vec![0.0; frames * self.channels];
        lock(&self.mixer).render(&mut out, self.channels);
        out
    }
}

impl OutputContext for HeadlessContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn state(&self) -> ContextState {
        *lock(&self.state)
    }

    fn resume(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ContextState::Closed => Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string())),
            _ => {
                *state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn suspend(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ContextState::Closed => Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string())),
            _ => {
                *state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state != ContextState::Closed {
            lock(&self.mixer).stop_all();
            *state = ContextState::Closed;
            debug!("Headless output context closed");
        }
        Ok(())
    }

    fn start_voice(&self, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle> {
        if *lock(&self.state) == ContextState::Closed {
            return Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string()));
        }
        lock(&self.mixer).add(buffer)
    }

    fn active_voices(&self) -> usize {
        lock(&self.mixer).active_voices()
    }
}
