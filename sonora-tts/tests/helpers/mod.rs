//! Shared test utilities
//!
//! - [`ScriptedGenerator`]: speech generator returning canned payloads, with
//!   an optional gate to hold a request in flight
//! - [`FailingContext`]: output context whose resume or close fails
//! - PCM fixture builders

#![allow(dead_code)]

use async_trait::async_trait;
use sonora_common::VoiceProfile;
use sonora_tts::audio::{
    ContextState, HeadlessContext, OutputContext, SampleBuffer, VoiceHandle,
};
use sonora_tts::speech::SpeechGenerator;
use sonora_tts::{Error, Result};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Test sample rate, matching the speech API output
pub const TEST_SAMPLE_RATE: u32 = 24_000;

/// One scripted generator reply
#[derive(Debug, Clone)]
pub enum Reply {
    Audio(Vec<u8>),
    Fail(String),
}

/// Speech generator replaying a script
///
/// Replies are consumed in order; once exhausted the last reply repeats.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Notify>>,
    entered: Notify,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Reply>) -> Self {
        let last = replies
            .last()
            .cloned()
            .unwrap_or_else(|| Reply::Audio(Vec::new()));
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            entered: Notify::new(),
        }
    }

    /// Always return `bytes`
    pub fn audio(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self::new(vec![Reply::Audio(bytes)]))
    }

    /// Always fail with `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self::new(vec![Reply::Fail(message.to_string())]))
    }

    /// Return `bytes`, but only after `gate` is notified
    pub fn gated(bytes: Vec<u8>, gate: Arc<Notify>) -> Arc<Self> {
        let mut generator = Self::new(vec![Reply::Audio(bytes)]);
        generator.gate = Some(gate);
        Arc::new(generator)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (text, voice name) of every request
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Resolves once a request has reached the generator
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.pop_front() {
            Some(reply) => {
                *self.last.lock().unwrap() = reply.clone();
                reply
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl SpeechGenerator for ScriptedGenerator {
    async fn generate_speech(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice.voice_name.as_str().to_string()));
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.next_reply() {
            Reply::Audio(bytes) => Ok(bytes),
            Reply::Fail(message) => Err(Error::ExternalCall(message)),
        }
    }
}

/// Headless context with an injected device failure
pub struct FailingContext {
    inner: HeadlessContext,
    fail_resume: bool,
    fail_close: bool,
}

impl FailingContext {
    /// Suspended context whose device refuses to start
    pub fn new() -> Self {
        Self {
            inner: HeadlessContext::suspended(TEST_SAMPLE_RATE),
            fail_resume: true,
            fail_close: false,
        }
    }

    /// Running context whose device errors on close
    pub fn failing_close() -> Self {
        Self {
            inner: HeadlessContext::new(TEST_SAMPLE_RATE),
            fail_resume: false,
            fail_close: true,
        }
    }
}

impl OutputContext for FailingContext {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn state(&self) -> ContextState {
        self.inner.state()
    }

    fn resume(&self) -> Result<()> {
        if self.fail_resume {
            return Err(Error::AudioOutput("device refused to start".to_string()));
        }
        self.inner.resume()
    }

    fn suspend(&self) -> Result<()> {
        self.inner.suspend()
    }

    fn close(&self) -> Result<()> {
        if self.fail_close {
            return Err(Error::AudioOutput("device vanished".to_string()));
        }
        self.inner.close()
    }

    fn start_voice(&self, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle> {
        self.inner.start_voice(buffer)
    }

    fn active_voices(&self) -> usize {
        self.inner.active_voices()
    }
}

/// Little-endian bytes of `samples`
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// `frames` frames of mono silence
pub fn silence_pcm(frames: usize) -> Vec<u8> {
    vec![0u8; frames * 2]
}

/// Mono sine wave at `amplitude` (0.0-1.0)
pub fn sine_pcm(frames: usize, frequency_hz: f32, amplitude: f32) -> Vec<u8> {
    let samples: Vec<i16> = (0..frames)
        .map(|i| {
            let t = i as f32 / TEST_SAMPLE_RATE as f32;
            ((2.0 * PI * frequency_hz * t).sin() * amplitude * 32767.0) as i16
        })
        .collect();
    pcm_bytes(&samples)
}

/// Every 257th i16 value plus both extremes
pub fn sweep_samples() -> Vec<i16> {
    let mut samples: Vec<i16> = (i16::MIN..=i16::MAX).step_by(257).collect();
    samples.push(i16::MAX);
    samples.push(-1);
    samples.push(0);
    samples.push(1);
    samples
}

/// Number of `.wav` files in `dir`
pub fn wav_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "wav"))
        .count()
}
