//! Core audio data types
//!
//! Defines the decoded sample buffer shared by playback and the WAV encoder.

use crate::error::{Error, Result};

/// SampleBuffer holds decoded audio ready for playback or encoding.
///
/// **Format:**
/// - Samples are f32, normalized to [-1.0, 1.0]
/// - Planar: one Vec per channel, each exactly `frame_count` long
/// - Immutable after construction; share it with `Arc<SampleBuffer>`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    channel_count: u16,
    frame_count: usize,
}

impl SampleBuffer {
    /// Create a buffer from per-channel sample arrays
    ///
    /// # Errors
    /// - `sample_rate` is zero
    /// - no channels supplied, or more than `u16::MAX`
    /// - channel arrays differ in length
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::Decode("sample rate must be positive".to_string()));
        }
        let Some(first) = channels.first() else {
            return Err(Error::Decode("at least one channel is required".to_string()));
        };
        let channel_count = u16::try_from(channels.len()).map_err(|_| {
            Error::Decode(format!(
                "{} channels exceeds the maximum of {}",
                channels.len(),
                u16::MAX
            ))
        })?;
        let frame_count = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != frame_count) {
            return Err(Error::Decode(format!(
                "channel {} has {} frames, expected {}",
                bad,
                channels[bad].len(),
                frame_count
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            channel_count,
            frame_count,
        })
    }

    /// Create a single-channel buffer
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![samples])
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (always >= 1)
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Samples per channel
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Read-only view of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Iterate channels in order
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Sample at `frame` on `channel`, if in range
    pub fn sample(&self, channel: usize, frame: usize) -> Option<f32> {
        self.channels.get(channel)?.get(frame).copied()
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.frame_count as u64 * 1000) / self.sample_rate as u64
    }

    /// True when the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_creation() {
        let buffer = SampleBuffer::new(24_000, vec![vec![0.5, -0.5], vec![0.25, -0.25]]).unwrap();

        assert_eq!(buffer.sample_rate(), 24_000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.sample(1, 1), Some(-0.25));
        assert_eq!(buffer.sample(2, 0), None);
    }

    #[test]
    fn test_sample_buffer_duration() {
        let buffer = SampleBuffer::mono(24_000, vec![0.0; 24_000]).unwrap();
        assert_eq!(buffer.duration_ms(), 1000);
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let result = SampleBuffer::new(24_000, vec![vec![0.0; 3], vec![0.0; 2]]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_zero_rate_and_no_channels_rejected() {
        assert!(SampleBuffer::mono(0, vec![0.0]).is_err());
        assert!(SampleBuffer::new(24_000, Vec::new()).is_err());
    }

    #[test]
    fn test_channel_count_fits_wav_header() {
        let result = SampleBuffer::new(8_000, vec![vec![0.0; 1]; 65_536]);
        assert!(matches!(result, Err(Error::Decode(_))));

        let widest = SampleBuffer::new(8_000, vec![Vec::new(); 65_535]).unwrap();
        assert_eq!(widest.channel_count(), u16::MAX);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = SampleBuffer::mono(24_000, Vec::new()).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_ms(), 0);
    }
}
