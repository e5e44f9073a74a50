//! Raw PCM decoding
//!
//! Converts 16-bit signed little-endian interleaved PCM (the speech API's
//! native output) into a normalized [`SampleBuffer`].
//!
//! Scaling divides by 32768, so decoded values lie in [-1.0, 32767/32768].
//! Encoding with [`Quantization::Symmetric`] reproduces every i16 exactly;
//! the legacy rule returns positive samples one step lower.
//!
//! [`Quantization::Symmetric`]: crate::audio::wav::Quantization::Symmetric

use crate::audio::SampleBuffer;
use crate::error::{Error, Result};

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Decode raw PCM bytes into a sample buffer.
///
/// # Arguments
/// - `raw`: 16-bit signed LE samples, interleaved by channel
/// - `sample_rate`: Rate of the raw stream in Hz
/// - `channel_count`: Interleaved channel count
///
/// # Errors
/// `Error::Decode` when the rate or channel count is zero, or when the byte
/// length does not divide into whole frames. Partial frames are never
/// silently truncated.
pub fn decode(raw: &[u8], sample_rate: u32, channel_count: u16) -> Result<SampleBuffer> {
    if sample_rate == 0 {
        return Err(Error::Decode("sample rate must be positive".to_string()));
    }
    if channel_count == 0 {
        return Err(Error::Decode("channel count must be at least 1".to_string()));
    }

    let channels = channel_count as usize;
    let frame_bytes = BYTES_PER_SAMPLE * channels;
    if raw.len() % frame_bytes != 0 {
        return Err(Error::Decode(format!(
            "{} bytes is not a whole number of {}-channel 16-bit frames",
            raw.len(),
            channels
        )));
    }

    let frame_count = raw.len() / frame_bytes;
    let mut planes: Vec<Vec<f32>> = (0..channels)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();

    for frame in raw.chunks_exact(frame_bytes) {
        for (plane, bytes) in planes.iter_mut().zip(frame.chunks_exact(BYTES_PER_SAMPLE)) {
            let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            plane.push(sample as f32 / 32768.0);
        }
    }

    SampleBuffer::new(sample_rate, planes)
}
