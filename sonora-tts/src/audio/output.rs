//! Audio output using cpal
//!
//! `AudioOutput` owns the cpal device and stream. Because `cpal::Stream` is
//! not `Send`, it lives on a dedicated audio thread; [`CpalContext`] drives
//! that thread over a command channel and shares only the voice mixer with
//! the real-time callback.
//!
//! A freshly opened context is suspended: the stream is built but paused
//! until the first `resume()`.

use crate::audio::context::{ContextState, OutputContext, CONTEXT_UNAVAILABLE};
use crate::audio::{SampleBuffer, VoiceHandle, VoiceMixer};
use crate::error::{Error, Result};
use crate::lock;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
///
/// Must be created and dropped on the same (non-async) thread.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Stream error flag - set by the error callback
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `sample_rate`: Preferred stream rate in Hz
    ///
    /// # Fallback Behavior
    /// If the requested device is not found, the default device is used.
    /// If the device cannot run at `sample_rate`, its default configuration
    /// is used and the mixer steps between rates.
    pub fn open(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let (config, sample_format) = Self::get_best_config(&device, sample_rate)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers `sample_rate` with f32 samples, then `sample_rate` in any
    /// format, then the device default.
    fn get_best_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate
            })
            .collect();

        let preferred = supported
            .iter()
            .find(|c| c.sample_format() == SampleFormat::F32)
            .or_else(|| supported.first());

        if let Some(range) = preferred {
            let sample_format = range.sample_format();
            let config = range.clone().with_sample_rate(cpal::SampleRate(sample_rate)).config();
            return Ok((config, sample_format));
        }

        warn!("Device does not support {} Hz, using its default configuration", sample_rate);
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    /// Build the stream (paused) rendering from `mixer`.
    pub fn start(&mut self, mixer: Arc<Mutex<VoiceMixer>>) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(mixer)?,
            SampleFormat::I16 => self.build_stream::<i16>(mixer)?,
            SampleFormat::U16 => self.build_stream::<u16>(mixer)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        // Some hosts start streams on creation
        stream
            .pause()
            .map_err(|e| Error::AudioOutput(format!("Failed to pause new stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream built (suspended)");
        Ok(())
    }

    fn build_stream<T>(&self, mixer: Arc<Mutex<VoiceMixer>>) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch: Vec<f32> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    // Never block the audio thread; a contended mixer yields silence
                    match mixer.try_lock() {
                        Ok(mut mixer) => mixer.render(&mut scratch, channels),
                        Err(_) => scratch.fill(0.0),
                    }
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Start (or continue) rendering
    pub fn play(&self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::AudioOutput("Stream not built".to_string()))?;
        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))
    }

    /// Pause rendering
    pub fn pause(&self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::AudioOutput("Stream not built".to_string()))?;
        stream
            .pause()
            .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))
    }

    /// Stop audio playback and drop the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Check if an audio stream error has occurred.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

type Reply = mpsc::Sender<Result<()>>;

enum Command {
    Resume(Reply),
    Suspend(Reply),
    Close(Reply),
}

/// Output context backed by a cpal stream on a dedicated thread
pub struct CpalContext {
    requested_rate: u32,
    device_rate: u32,
    device_name: String,
    state: Mutex<ContextState>,
    mixer: Arc<Mutex<VoiceMixer>>,
    commands: mpsc::Sender<Command>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct Ready {
    device_rate: u32,
    device_name: String,
}

impl CpalContext {
    /// Open the device and build a suspended stream.
    ///
    /// # Errors
    /// `Error::Initialization` if no device can be opened.
    pub fn open(device_name: Option<String>, sample_rate: u32) -> Result<Self> {
        let mixer = Arc::new(Mutex::new(VoiceMixer::new(sample_rate)));
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Ready>>();

        let thread_mixer = Arc::clone(&mixer);
        let handle = std::thread::Builder::new()
            .name("sonora-audio".to_string())
            .spawn(move || {
                audio_thread(device_name, sample_rate, thread_mixer, command_rx, ready_tx)
            })
            .map_err(|e| Error::Initialization(format!("Failed to spawn audio thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| Error::Initialization("Audio thread exited during startup".to_string()))?
            .map_err(|e| Error::Initialization(format!("{} ({})", CONTEXT_UNAVAILABLE, e)))?;

        info!(
            device = %ready.device_name,
            requested_rate = sample_rate,
            device_rate = ready.device_rate,
            "Audio output context opened"
        );

        Ok(Self {
            requested_rate: sample_rate,
            device_rate: ready.device_rate,
            device_name: ready.device_name,
            state: Mutex::new(ContextState::Suspended),
            mixer,
            commands: command_tx,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Rate the device actually runs at
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    /// Name of the opened device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(make(reply_tx))
            .map_err(|_| Error::AudioOutput("Audio thread is not running".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio thread dropped the request".to_string()))?
    }
}

impl OutputContext for CpalContext {
    fn sample_rate(&self) -> u32 {
        self.requested_rate
    }

    fn state(&self) -> ContextState {
        *lock(&self.state)
    }

    fn resume(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ContextState::Closed => Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string())),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.request(Command::Resume)?;
                *state = ContextState::Running;
                debug!("Audio output context resumed");
                Ok(())
            }
        }
    }

    fn suspend(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ContextState::Closed => Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string())),
            ContextState::Suspended => Ok(()),
            ContextState::Running => {
                self.request(Command::Suspend)?;
                *state = ContextState::Suspended;
                debug!("Audio output context suspended");
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state == ContextState::Closed {
            return Ok(());
        }
        *state = ContextState::Closed;
        lock(&self.mixer).stop_all();

        let result = self.request(Command::Close);
        if let Some(handle) = lock(&self.thread).take() {
            if handle.join().is_err() {
                warn!("Audio thread panicked during shutdown");
            }
        }
        info!("Audio output context closed");
        result
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

impl Drop for CpalContext {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close audio output context: {}", e);
        }
    }
}

/// Owns the `AudioOutput` for its whole life and serves commands
fn audio_thread(
    device_name: Option<String>,
    sample_rate: u32,
    mixer: Arc<Mutex<VoiceMixer>>,
    commands: mpsc::Receiver<Command>,
    ready: mpsc::Sender<Result<Ready>>,
) {
    let mut output = match AudioOutput::open(device_name.as_deref(), sample_rate) {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to create audio output: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    lock(&mixer).set_output_rate(output.sample_rate());

    if let Err(e) = output.start(Arc::clone(&mixer)) {
        error!("Failed to start audio output: {}", e);
        let _ = ready.send(Err(e));
        return;
    }

    let _ = ready.send(Ok(Ready {
        device_rate: output.sample_rate(),
        device_name: output.device_name(),
    }));

    // Exits on Close or when the context is dropped without closing
    while let Ok(command) = commands.recv() {
        match command {
            Command::Resume(reply) => {
                let _ = reply.send(output.play());
            }
            Command::Suspend(reply) => {
                let _ = reply.send(output.pause());
            }
            Command::Close(reply) => {
                let _ = reply.send(output.stop());
                break;
            }
        }
        if output.has_error() {
            warn!("Audio stream reported an error; playback may be interrupted");
        }
    }

    debug!("Audio thread exiting");
}
