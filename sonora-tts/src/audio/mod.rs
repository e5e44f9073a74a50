//! Audio pipeline
//!
//! Raw 16-bit PCM from the speech API is decoded into a [`SampleBuffer`],
//! encoded into a WAV file for download, and played through an
//! [`OutputContext`] (cpal device or headless).

pub mod context;
pub mod headless;
pub mod mixer;
pub mod output;
pub mod pcm;
pub mod resampler;
pub mod types;
pub mod wav;

pub use context::{ContextState, OutputContext, CONTEXT_UNAVAILABLE};
pub use headless::HeadlessContext;
pub use mixer::{VoiceHandle, VoiceMixer};
pub use output::{AudioOutput, CpalContext};
pub use types::SampleBuffer;
pub use wav::{ChannelLayout, Quantization, WavHeader, WavOptions};
