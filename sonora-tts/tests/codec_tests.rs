//! PCM decoder and WAV encoder tests
//!
//! Encoded files are read back with hound, independently of our own header
//! parser.

mod helpers;

use helpers::{pcm_bytes, sine_pcm, sweep_samples, TEST_SAMPLE_RATE};
use hound::WavReader;
use sonora_tts::audio::pcm::decode;
use sonora_tts::audio::wav::{encode, encode_with, WAV_HEADER_LEN};
use sonora_tts::audio::{ChannelLayout, Quantization, SampleBuffer, WavHeader, WavOptions};
use sonora_tts::Error;
use std::io::Cursor;

fn payload_samples(wav: &[u8]) -> Vec<i16> {
    wav[WAV_HEADER_LEN..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

fn symmetric() -> WavOptions {
    WavOptions {
        quantization: Quantization::Symmetric,
        ..WavOptions::default()
    }
}

#[test]
fn test_hound_reads_encoded_mono() {
    let raw = sine_pcm(2_400, 440.0, 0.5);
    let buffer = decode(&raw, TEST_SAMPLE_RATE, 1).unwrap();
    let wav = encode(&buffer).unwrap();

    let reader = WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.duration(), 2_400);
}

#[test]
fn test_one_second_response_layout() {
    // 48000 bytes = 24000 frames of 24 kHz mono
    let raw = sine_pcm(24_000, 220.0, 0.8);
    assert_eq!(raw.len(), 48_000);

    let buffer = decode(&raw, 24_000, 1).unwrap();
    assert_eq!(buffer.frame_count(), 24_000);
    assert_eq!(buffer.duration_ms(), 1_000);

    let wav = encode(&buffer).unwrap();
    assert_eq!(wav.len(), 48_044);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&wav[12..16], b"fmt ");
    assert_eq!(&wav[36..40], b"data");

    let header = WavHeader::parse(&wav).unwrap();
    assert_eq!(header.channels, 1);
    assert_eq!(header.sample_rate, 24_000);
    assert_eq!(header.byte_rate, 48_000);
    assert_eq!(header.block_align, 2);
    assert_eq!(header.bits_per_sample, 16);
    assert_eq!(header.data_len, 48_000);
}

#[test]
fn test_symmetric_round_trip_is_exact() {
    let samples = sweep_samples();
    let raw = pcm_bytes(&samples);

    let buffer = decode(&raw, TEST_SAMPLE_RATE, 1).unwrap();
    let wav = encode_with(&buffer, symmetric()).unwrap();

    assert_eq!(&wav[WAV_HEADER_LEN..], raw.as_slice());
}

#[test]
fn test_legacy_round_trip() {
    let samples = sweep_samples();
    let raw = pcm_bytes(&samples);

    let buffer = decode(&raw, TEST_SAMPLE_RATE, 1).unwrap();
    let decoded = payload_samples(&encode(&buffer).unwrap());

    for (&original, &round_tripped) in samples.iter().zip(decoded.iter()) {
        // x32767 on the positive side lands just below the integer
        let expected = if original > 0 { original - 1 } else { original };
        assert_eq!(round_tripped, expected, "sample {}", original);
    }
    assert_eq!(decoded.first(), Some(&i16::MIN));
}

#[test]
fn test_length_law() {
    for (frames, channels) in [(0usize, 1u16), (1, 1), (7, 2), (100, 3), (24_000, 1)] {
        let planes = vec![vec![0.1f32; frames]; channels as usize];
        let buffer = SampleBuffer::new(16_000, planes).unwrap();
        let wav = encode(&buffer).unwrap();
        assert_eq!(
            wav.len(),
            44 + frames * channels as usize * 2,
            "{} frames x {} channels",
            frames,
            channels
        );
    }
}

#[test]
fn test_stereo_interleaved_matches_hound() {
    // L ramps up, R ramps down
    let interleaved: Vec<i16> = (0..50).flat_map(|i| [i * 100, -i * 100]).collect();
    let raw = pcm_bytes(&interleaved);

    let buffer = decode(&raw, 48_000, 2).unwrap();
    assert_eq!(buffer.channel_count(), 2);
    assert_eq!(buffer.frame_count(), 50);

    let wav = encode_with(&buffer, symmetric()).unwrap();
    let mut reader = WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 48_000);

    let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read, interleaved);
}

#[test]
fn test_planar_layout_is_opt_in() {
    let interleaved: Vec<i16> = vec![1, -1, 2, -2, 3, -3];
    let buffer = decode(&pcm_bytes(&interleaved), 8_000, 2).unwrap();

    let planar = encode_with(
        &buffer,
        WavOptions {
            layout: ChannelLayout::Planar,
            quantization: Quantization::Symmetric,
        },
    )
    .unwrap();

    assert_eq!(payload_samples(&planar), vec![1, 2, 3, -1, -2, -3]);
}

#[test]
fn test_decode_rejects_partial_frames() {
    let err = decode(&[0u8; 3], TEST_SAMPLE_RATE, 1).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));

    // 3 samples cannot split across 2 channels
    let err = decode(&pcm_bytes(&[1, 2, 3]), TEST_SAMPLE_RATE, 2).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(err.to_string().starts_with("Audio decode error:"));
}

#[test]
fn test_decode_scaling() {
    let buffer = decode(&pcm_bytes(&[i16::MIN, 0, 16_384, i16::MAX]), 24_000, 1).unwrap();
    let channel = buffer.channel(0).unwrap();

    assert_eq!(channel[0], -1.0);
    assert_eq!(channel[1], 0.0);
    assert_eq!(channel[2], 0.5);
    assert!(channel[3] < 1.0);
    assert_eq!(channel[3], 32_767.0 / 32_768.0);
}
