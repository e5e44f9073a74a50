//! Sample-rate conversion using rubato
//!
//! Speech arrives at 24 kHz but many devices only open at 44.1 or 48 kHz.
//! A voice is converted once, whole, before it reaches the mixer.

use crate::audio::SampleBuffer;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Convert `buffer` to `output_rate`.
///
/// The result has exactly `frames * output_rate / input_rate` frames
/// (rounded down), aligned so that output frame 0 matches input frame 0.
/// Buffers already at `output_rate` are returned as a copy.
pub fn resample(buffer: &SampleBuffer, output_rate: u32) -> Result<SampleBuffer> {
    let input_rate = buffer.sample_rate();
    if input_rate == output_rate {
        return Ok(buffer.clone());
    }
    if output_rate == 0 {
        return Err(Error::Decode("output rate must be positive".to_string()));
    }

    let channels = buffer.channel_count() as usize;
    let output_frames =
        (buffer.frame_count() as u64 * output_rate as u64 / input_rate as u64) as usize;
    if buffer.is_empty() {
        return SampleBuffer::new(output_rate, vec![Vec::new(); channels]);
    }

    debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels)",
        buffer.frame_count(),
        input_rate,
        output_rate,
        channels
    );

    // Whole buffer as a single chunk
    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        buffer.frame_count(),
        channels,
    )
    .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let planes: Vec<&[f32]> = buffer.channels().collect();
    let mut output = resampler
        .process(&planes, None)
        .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

    // Flush the frames still held back by the filter delay
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

    for (plane, rest) in output.iter_mut().zip(tail) {
        plane.extend(rest);
        plane.drain(..delay.min(plane.len()));
        plane.resize(output_frames, 0.0);
    }

    SampleBuffer::new(output_rate, output)
}
