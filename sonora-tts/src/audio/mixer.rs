//! Voice mixer shared by the output contexts
//!
//! A "voice" is one sample buffer being played from its start. The mixer sums
//! every live voice into an interleaved output block. Keeping only one voice
//! alive is the playback controller's job; the mixer will happily render
//! several, which is what makes that guarantee observable in tests.
//!
//! Buffers not at the output rate are resampled when the voice is added, so
//! rendering is a straight frame-for-frame copy.

use crate::audio::{resampler, SampleBuffer};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct VoiceFlags {
    stopped: AtomicBool,
    finished: AtomicBool,
    frames_played: AtomicUsize,
}

/// Handle to a voice owned by a mixer
///
/// Cloning the handle does not duplicate the voice.
#[derive(Debug, Clone)]
pub struct VoiceHandle {
    id: u64,
    frame_count: usize,
    flags: Arc<VoiceFlags>,
}

impl VoiceHandle {
    /// Mixer-assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Frames the voice lasts at the mixer's output rate
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Stop the voice. Returns true if it was still audible.
    pub fn stop(&self) -> bool {
        let was_stopped = self.flags.stopped.swap(true, Ordering::SeqCst);
        !was_stopped && !self.is_finished()
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped.load(Ordering::SeqCst)
    }

    /// Played through to the end of its buffer
    pub fn is_finished(&self) -> bool {
        self.flags.finished.load(Ordering::SeqCst)
    }

    /// Neither stopped nor finished
    pub fn is_active(&self) -> bool {
        !self.is_stopped() && !self.is_finished()
    }

    /// Frames rendered so far
    pub fn frames_played(&self) -> usize {
        self.flags.frames_played.load(Ordering::Relaxed)
    }
}

struct MixerVoice {
    buffer: Arc<SampleBuffer>,
    position: usize,
    flags: Arc<VoiceFlags>,
}

/// Sums live voices into interleaved f32 output
pub struct VoiceMixer {
    output_rate: u32,
    voices: Vec<MixerVoice>,
    next_id: u64,
}

impl VoiceMixer {
    /// Create a mixer rendering at `output_rate` Hz
    pub fn new(output_rate: u32) -> Self {
        Self {
            output_rate: output_rate.max(1),
            voices: Vec::new(),
            next_id: 1,
        }
    }

    /// Output rate in Hz
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Change the output rate (device negotiated a different one)
    pub fn set_output_rate(&mut self, rate: u32) {
        self.output_rate = rate.max(1);
    }

    /// Start a voice at the beginning of `buffer`
    ///
    /// # Errors
    /// `Error::Decode` when the buffer cannot be resampled to the output rate.
    pub fn add(&mut self, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle> {
        let buffer = if buffer.sample_rate() == self.output_rate {
            buffer
        } else {
            Arc::new(resampler::resample(&buffer, self.output_rate)?)
        };

        let id = self.next_id;
        self.next_id += 1;

        let flags = Arc::new(VoiceFlags::default());
        if buffer.is_empty() {
            flags.finished.store(true, Ordering::SeqCst);
        }

        let handle = VoiceHandle {
            id,
            frame_count: buffer.frame_count(),
            flags: Arc::clone(&flags),
        };
        self.voices.push(MixerVoice {
            buffer,
            position: 0,
            flags,
        });
        Ok(handle)
    }

    /// Voices that would contribute to the next render
    pub fn active_voices(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| {
                !v.flags.stopped.load(Ordering::SeqCst) && !v.flags.finished.load(Ordering::SeqCst)
            })
            .count()
    }

    /// Stop every voice
    pub fn stop_all(&mut self) {
        for voice in self.voices.drain(..) {
            voice.flags.stopped.store(true, Ordering::SeqCst);
        }
    }

    /// Render one block of interleaved output.
    ///
    /// Mono sources are duplicated to every output channel; multi-channel
    /// sources map channel-for-channel, repeating their last channel when the
    /// device has more.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 {
            return;
        }

        for voice in self.voices.iter_mut() {
            if voice.flags.stopped.load(Ordering::SeqCst) {
                continue;
            }

            let buffer = &voice.buffer;
            let src_channels = buffer.channel_count() as usize;

            for frame in out.chunks_mut(channels) {
                if voice.position >= buffer.frame_count() {
                    break;
                }
                for (c, slot) in frame.iter_mut().enumerate() {
                    let src = c.min(src_channels - 1);
                    *slot += buffer.sample(src, voice.position).unwrap_or(0.0);
                }
                voice.position += 1;
            }

            voice.flags.frames_played.store(voice.position, Ordering::Relaxed);
            if voice.position >= buffer.frame_count() {
                voice.flags.finished.store(true, Ordering::SeqCst);
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.voices.retain(|v| {
            !v.flags.stopped.load(Ordering::SeqCst) && !v.flags.finished.load(Ordering::SeqCst)
        });
    }
}
