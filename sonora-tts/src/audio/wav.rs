//! WAV (RIFF/WAVE, 16-bit PCM) encoding
//!
//! Produces the canonical 44-byte header followed by the PCM payload, all
//! integers little-endian.
//!
//! Two encoder choices are configurable through [`WavOptions`]:
//! - [`ChannelLayout`]: interleaved (standard) or planar payload. Planar is
//!   what older builds wrote for multi-channel buffers even though the header
//!   describes interleaved PCM. Mono output is identical either way.
//! - [`Quantization`]: the legacy asymmetric truncation (default, byte
//!   compatible with previously generated files) or symmetric rounding, which
//!   inverts [`crate::audio::pcm::decode`] exactly.

use crate::audio::SampleBuffer;
use crate::error::{Error, Result};

/// Size of the canonical RIFF/WAVE header
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Payload sample ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelLayout {
    /// Frame by frame: L0 R0 L1 R1 ...
    #[default]
    Interleaved,
    /// Channel by channel: L0 L1 ... R0 R1 ...
    Planar,
}

/// Float to i16 conversion rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantization {
    /// Clamp, negative x 32768, non-negative x 32767, truncate toward zero
    #[default]
    Legacy,
    /// Clamp, x 32768, round to nearest, saturate at i16 bounds
    Symmetric,
}

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WavOptions {
    pub layout: ChannelLayout,
    pub quantization: Quantization,
}

/// Parsed fields of a canonical 44-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Header describing `frame_count` frames of 16-bit PCM
    pub fn for_pcm16(channels: u16, sample_rate: u32, frame_count: usize) -> Result<Self> {
        let block_align = channels
            .checked_mul(2)
            .ok_or_else(|| Error::Encode(format!("{} channels exceed block align range", channels)))?;
        let byte_rate = sample_rate
            .checked_mul(block_align as u32)
            .ok_or_else(|| Error::Encode(format!("byte rate overflow at {} Hz", sample_rate)))?;
        let data_len = frame_count
            .checked_mul(block_align as usize)
            .and_then(|len| u32::try_from(len).ok())
            .filter(|len| len.checked_add(36).is_some())
            .ok_or_else(|| {
                Error::Encode(format!("{} frames exceed the RIFF size limit", frame_count))
            })?;

        Ok(Self {
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample: BITS_PER_SAMPLE,
            data_len,
        })
    }

    /// Serialize the 44 header bytes
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut out = [0u8; WAV_HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&(36 + self.data_len).to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        out[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_len.to_le_bytes());
        out
    }

    /// Parse a canonical header (as written by [`encode`])
    ///
    /// Only the fixed 44-byte layout is accepted; extended fmt chunks or
    /// extra chunks before `data` are rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(Error::Decode(format!(
                "WAV header needs {} bytes, got {}",
                WAV_HEADER_LEN,
                bytes.len()
            )));
        }
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        if &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
        {
            return Err(Error::Decode("not a canonical RIFF/WAVE header".to_string()));
        }
        if u32_at(16) != FMT_CHUNK_LEN || u16_at(20) != PCM_FORMAT {
            return Err(Error::Decode("only 16-byte PCM fmt chunks are supported".to_string()));
        }

        Ok(Self {
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_len: u32_at(40),
        })
    }
}

/// Convert one normalized sample to i16
pub fn quantize(sample: f32, rule: Quantization) -> i16 {
    let s = (sample as f64).clamp(-1.0, 1.0);
    match rule {
        // `as` truncates toward zero; the clamp keeps the product in range
        Quantization::Legacy => {
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        }
        Quantization::Symmetric => (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16,
    }
}

/// Encode with default options (interleaved, legacy quantization)
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    encode_with(buffer, WavOptions::default())
}

/// Encode a sample buffer into a complete WAV file
///
/// Output length is always `44 + frame_count * channel_count * 2`.
pub fn encode_with(buffer: &SampleBuffer, options: WavOptions) -> Result<Vec<u8>> {
    let header = WavHeader::for_pcm16(
        buffer.channel_count(),
        buffer.sample_rate(),
        buffer.frame_count(),
    )?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + header.data_len as usize);
    out.extend_from_slice(&header.to_bytes());

    let mut push = |sample: f32| {
        out.extend_from_slice(&quantize(sample, options.quantization).to_le_bytes());
    };

    match options.layout {
        ChannelLayout::Interleaved => {
            for frame in 0..buffer.frame_count() {
                for channel in buffer.channels() {
                    push(channel[frame]);
                }
            }
        }
        ChannelLayout::Planar => {
            for channel in buffer.channels() {
                for &sample in channel {
                    push(sample);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_one_second_mono() {
        let buffer = SampleBuffer::mono(24_000, vec![0.0; 24_000]).unwrap();
        let wav = encode(&buffer).unwrap();

        assert_eq!(wav.len(), 48_044);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36 + 48_000);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");

        let header = WavHeader::parse(&wav).unwrap();
        assert_eq!(header.channels, 1);
        assert_eq!(header.sample_rate, 24_000);
        assert_eq!(header.byte_rate, 48_000);
        assert_eq!(header.block_align, 2);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_len, 48_000);
    }

    #[test]
    fn test_legacy_quantization_extremes() {
        let q = Quantization::Legacy;
        assert_eq!(quantize(-1.0, q), -32768);
        assert_eq!(quantize(1.0, q), 32767);
        assert_eq!(quantize(0.0, q), 0);
        assert_eq!(quantize(-2.5, q), -32768);
        assert_eq!(quantize(7.0, q), 32767);
        // truncation toward zero, not rounding
        assert_eq!(quantize(0.5, q), 16383);
        assert_eq!(quantize(-0.5, q), -16384);
        assert_eq!(quantize(-0.00001, q), 0);
    }

    #[test]
    fn test_symmetric_quantization_inverts_decode() {
        let q = Quantization::Symmetric;
        for value in [i16::MIN, -12345, -1, 0, 1, 16384, i16::MAX] {
            assert_eq!(quantize(value as f32 / 32768.0, q), value);
        }
        assert_eq!(quantize(1.0, q), i16::MAX);
        assert_eq!(quantize(-1.0, q), i16::MIN);
    }

    #[test]
    fn test_stereo_layouts() {
        let buffer = SampleBuffer::new(8_000, vec![vec![-1.0, -0.5], vec![1.0, 0.0]]).unwrap();

        let interleaved = encode(&buffer).unwrap();
        let planar = encode_with(
            &buffer,
            WavOptions {
                layout: ChannelLayout::Planar,
                ..WavOptions::default()
            },
        )
        .unwrap();

        let samples = |wav: &[u8]| -> Vec<i16> {
            wav[WAV_HEADER_LEN..]
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect()
        };
        assert_eq!(samples(&interleaved), vec![-32768, 32767, -16384, 0]);
        assert_eq!(samples(&planar), vec![-32768, -16384, 32767, 0]);

        let header = WavHeader::parse(&interleaved).unwrap();
        assert_eq!(header.block_align, 4);
        assert_eq!(header.byte_rate, 32_000);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let buffer = SampleBuffer::mono(24_000, Vec::new()).unwrap();
        let wav = encode(&buffer).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(WavHeader::parse(&wav).unwrap().data_len, 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(WavHeader::parse(&[0u8; 10]).is_err());
        assert!(WavHeader::parse(&[0u8; 44]).is_err());
    }
}
