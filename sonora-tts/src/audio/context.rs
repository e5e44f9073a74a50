//! Output context abstraction
//!
//! An output context is the single process-wide audio sink. It can be
//! suspended (no time passes, nothing is heard), resumed, and closed for good.
//! Playback voices are started on it from a decoded [`SampleBuffer`].

use crate::audio::{SampleBuffer, VoiceHandle};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Message used whenever a context is missing or already closed
pub const CONTEXT_UNAVAILABLE: &str = "Audio context is not available.";

/// Lifecycle state of an output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Rendering audio
    Running,
    /// Open but paused; must be resumed before anything is heard
    Suspended,
    /// Released; cannot be reopened
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextState::Running => "running",
            ContextState::Suspended => "suspended",
            ContextState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An audio output session that can play sample buffers
pub trait OutputContext {
    /// Rate the context was opened at (Hz)
    fn sample_rate(&self) -> u32;

    /// Current lifecycle state
    fn state(&self) -> ContextState;

    /// Resume a suspended context. No-op when already running.
    ///
    /// # Errors
    /// Fails when the context is closed or the device refuses to start.
    fn resume(&self) -> Result<()>;

    /// Suspend a running context. No-op when already suspended.
    fn suspend(&self) -> Result<()>;

    /// Close the context and release the device. Idempotent.
    fn close(&self) -> Result<()>;

    /// Start playing `buffer` from its beginning, immediately
    ///
    /// # Errors
    /// `Error::Initialization` when the context is closed.
    fn start_voice(&self, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle>;

    /// Number of voices currently audible (or audible once resumed)
    fn active_voices(&self) -> usize;
}
