//! Speech studio session
//!
//! `Studio` is the UI-facing orchestrator: it owns the output context, the
//! playback controller, the downloadable WAV slot and the shared UI state,
//! and drives one generation at a time:
//!
//! validate -> busy guard -> reset UI -> check/resume context -> call the
//! speech generator -> decode -> encode -> install WAV -> play
//!
//! Every method takes `&self`, so a front end can keep a generation in
//! flight while it still reads snapshots, stops playback or tears the
//! session down. Locks are never held across an await point.

use crate::audio::{
    pcm, wav, ContextState, OutputContext, SampleBuffer, VoiceHandle, WavOptions,
    CONTEXT_UNAVAILABLE,
};
use crate::error::{Error, Result};
use crate::lock;
use crate::playback::PlaybackController;
use crate::resources::ResourceSlot;
use crate::speech::gemini::NO_AUDIO_DATA;
use crate::speech::SpeechGenerator;
use crate::state::{SharedState, UiState};
use chrono::Utc;
use sonora_common::config::{
    DEFAULT_CHANNELS, DEFAULT_MAX_TEXT_LENGTH, DEFAULT_OUTPUT_FILE, DEFAULT_SAMPLE_RATE,
};
use sonora_common::events::SessionEvent;
use sonora_common::voices::{default_voice, find_voice};
use sonora_common::VoiceProfile;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EMPTY_TEXT: &str = "Please enter some text to convert to speech.";
const VOICE_NOT_FOUND: &str = "Selected voice not found.";

/// Poll interval for [`Studio::wait_for_playback`]
const PLAYBACK_POLL: Duration = Duration::from_millis(50);

/// Studio settings
#[derive(Debug, Clone)]
pub struct StudioOptions {
    /// Rate of the PCM returned by the generator (Hz)
    pub sample_rate: u32,
    /// Channels of the PCM returned by the generator
    pub channels: u16,
    pub max_text_length: usize,
    pub wav: WavOptions,
    /// Directory for the temporary WAV (system temp dir when `None`)
    pub resource_dir: Option<PathBuf>,
    /// Download target when none (or a directory) is given
    pub output_file: PathBuf,
    /// Initially selected voice id
    pub voice_id: String,
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            wav: WavOptions::default(),
            resource_dir: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            voice_id: default_voice().id.to_string(),
        }
    }
}

/// Outcome of a successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub generation_id: Uuid,
    pub voice_id: String,
    pub frame_count: usize,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub wav_bytes: usize,
    pub resource_url: String,
}

/// Clears the busy flag when the generation ends, on every path
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One text-to-speech session
pub struct Studio<C: OutputContext, G: SpeechGenerator> {
    context: C,
    generator: G,
    options: StudioOptions,
    state: Arc<SharedState>,
    playback: Mutex<PlaybackController>,
    resources: Mutex<ResourceSlot>,
    buffer: Mutex<Option<Arc<SampleBuffer>>>,
    busy: AtomicBool,
    closed: AtomicBool,
}

impl<C: OutputContext, G: SpeechGenerator> Studio<C, G> {
    pub fn new(context: C, generator: G, options: StudioOptions) -> Self {
        let initial = UiState::new(options.voice_id.clone(), options.max_text_length);
        let resources = ResourceSlot::new(options.resource_dir.clone());

        info!(
            voice = %options.voice_id,
            sample_rate = options.sample_rate,
            context_rate = context.sample_rate(),
            context_state = %context.state(),
            "Studio session started"
        );

        Self {
            context,
            generator,
            options,
            state: Arc::new(SharedState::new(initial)),
            playback: Mutex::new(PlaybackController::new()),
            resources: Mutex::new(resources),
            buffer: Mutex::new(None),
            busy: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.state.subscribe_events()
    }

    pub async fn snapshot(&self) -> UiState {
        self.state.snapshot().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Currently decoded buffer, if any
    pub fn buffer(&self) -> Option<Arc<SampleBuffer>> {
        lock(&self.buffer).clone()
    }

    /// Number of WAV files this session keeps on disk
    pub fn live_resources(&self) -> usize {
        lock(&self.resources).live_count()
    }

    /// Replace the input text and clear any error
    pub async fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state
            .update(|ui| {
                ui.text = text;
                ui.error = None;
            })
            .await;
    }

    /// Select a catalog voice and clear any error
    ///
    /// # Errors
    /// `Error::Validation` for an unknown id; the selection is unchanged.
    pub async fn select_voice(&self, voice_id: &str) -> Result<&'static VoiceProfile> {
        let Some(voice) = find_voice(voice_id) else {
            let err = Error::Validation(VOICE_NOT_FOUND.to_string());
            self.state.update(|ui| ui.error = Some(err.user_message())).await;
            return Err(err);
        };

        self.state
            .update(|ui| {
                ui.voice_id = voice.id.to_string();
                ui.error = None;
            })
            .await;
        debug!(voice = voice.id, "Voice selected");
        Ok(voice)
    }

    /// Set the input text, then generate
    pub async fn generate_text(&self, text: impl Into<String>) -> Result<GenerationReport> {
        self.set_text(text).await;
        self.generate().await
    }

    /// Generate speech for the current text and voice, then play it.
    ///
    /// # Errors
    /// - `Error::Validation`: blank text, text over the limit, unknown voice
    /// - `Error::Busy`: another generation is in flight
    /// - `Error::Initialization`: output context closed or failed to resume
    /// - `Error::ExternalCall` / `Error::Decode`: generator or payload failure
    /// - `Error::SessionClosed`: the session was torn down mid-request
    pub async fn generate(&self) -> Result<GenerationReport> {
        let UiState { text, voice_id, .. } = self.state.snapshot().await;

        let voice = match self.validate(&text, &voice_id) {
            Ok(voice) => voice,
            Err(err) => {
                warn!("Generation rejected: {}", err);
                let message = err.user_message();
                self.state.update(|ui| ui.error = Some(message.clone())).await;
                self.state.broadcast_event(SessionEvent::GenerationFailed {
                    generation_id: None,
                    message,
                    timestamp: Utc::now(),
                });
                return Err(err);
            }
        };

        // The in-flight generation owns the UI state; leave it alone
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("Generation rejected: another generation is in progress");
            return Err(Error::Busy);
        };

        let generation_id = Uuid::new_v4();
        let char_count = text.chars().count();
        info!(%generation_id, voice = voice.id, char_count, "Generating speech");

        self.state
            .update(|ui| {
                ui.loading = true;
                ui.error = None;
                ui.has_buffer = false;
                ui.resource_url = None;
            })
            .await;
        lock(&self.buffer).take();
        self.release_resource();

        self.state.broadcast_event(SessionEvent::GenerationStarted {
            generation_id,
            voice_id: voice.id.to_string(),
            char_count,
            timestamp: Utc::now(),
        });

        match self.synthesize(&text, voice, generation_id).await {
            Ok(report) => {
                let url = report.resource_url.clone();
                self.state
                    .update(|ui| {
                        ui.loading = false;
                        ui.has_buffer = true;
                        ui.resource_url = Some(url);
                    })
                    .await;
                let total = self.state.increment_generations();
                info!(
                    %generation_id,
                    frames = report.frame_count,
                    duration_ms = report.duration_ms,
                    wav_bytes = report.wav_bytes,
                    generations_total = total,
                    "Speech generated"
                );
                self.state.broadcast_event(SessionEvent::GenerationCompleted {
                    generation_id,
                    frame_count: report.frame_count,
                    sample_rate: report.sample_rate,
                    duration_ms: report.duration_ms,
                    wav_bytes: report.wav_bytes,
                    timestamp: Utc::now(),
                });
                Ok(report)
            }
            Err(Error::SessionClosed) => {
                debug!(%generation_id, "Session closed during generation, result discarded");
                self.state.update(|ui| ui.loading = false).await;
                Err(Error::SessionClosed)
            }
            Err(err) => {
                warn!(%generation_id, "Speech generation failed: {}", err);
                lock(&self.buffer).take();
                self.release_resource();

                let message = err.user_message();
                self.state
                    .update(|ui| {
                        ui.loading = false;
                        ui.has_buffer = false;
                        ui.resource_url = None;
                        ui.error = Some(message.clone());
                    })
                    .await;
                self.state.broadcast_event(SessionEvent::GenerationFailed {
                    generation_id: Some(generation_id),
                    message,
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    fn validate(&self, text: &str, voice_id: &str) -> Result<&'static VoiceProfile> {
        if text.trim().is_empty() {
            return Err(Error::Validation(EMPTY_TEXT.to_string()));
        }
        let max = self.options.max_text_length;
        if text.chars().count() > max {
            return Err(Error::Validation(format!(
                "Text exceeds maximum length of {} characters.",
                max
            )));
        }
        find_voice(voice_id).ok_or_else(|| Error::Validation(VOICE_NOT_FOUND.to_string()))
    }

    /// Make sure the context can play, resuming it when suspended
    fn ensure_context(&self) -> Result<()> {
        match self.context.state() {
            ContextState::Running => Ok(()),
            ContextState::Closed => Err(Error::Initialization(CONTEXT_UNAVAILABLE.to_string())),
            ContextState::Suspended => {
                debug!("Resuming suspended output context");
                self.context.resume()
            }
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        generation_id: Uuid,
    ) -> Result<GenerationReport> {
        self.ensure_context()?;

        let raw = self.generator.generate_speech(text, voice).await?;
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        if raw.is_empty() {
            return Err(Error::ExternalCall(NO_AUDIO_DATA.to_string()));
        }

        let buffer = Arc::new(pcm::decode(
            &raw,
            self.options.sample_rate,
            self.options.channels,
        )?);
        *lock(&self.buffer) = Some(Arc::clone(&buffer));

        let wav_bytes = wav::encode_with(&buffer, self.options.wav)?;
        let resource_url = {
            let mut slot = lock(&self.resources);
            slot.install(&wav_bytes)?.url().to_string()
        };
        self.state.broadcast_event(SessionEvent::ResourceCreated {
            url: resource_url.clone(),
            size_bytes: wav_bytes.len(),
            timestamp: Utc::now(),
        });

        self.start_playback(Arc::clone(&buffer))?;

        Ok(GenerationReport {
            generation_id,
            voice_id: voice.id.to_string(),
            frame_count: buffer.frame_count(),
            sample_rate: buffer.sample_rate(),
            duration_ms: buffer.duration_ms(),
            wav_bytes: wav_bytes.len(),
            resource_url,
        })
    }

    fn start_playback(&self, buffer: Arc<SampleBuffer>) -> Result<VoiceHandle> {
        let frame_count = buffer.frame_count();
        let handle = lock(&self.playback).play(&self.context, buffer)?;
        self.state.broadcast_event(SessionEvent::PlaybackStarted {
            frame_count,
            timestamp: Utc::now(),
        });
        Ok(handle)
    }

    fn release_resource(&self) {
        if let Some(url) = lock(&self.resources).release() {
            self.state.broadcast_event(SessionEvent::ResourceReleased {
                url,
                timestamp: Utc::now(),
            });
        }
    }

    /// Play the current buffer again from its start.
    ///
    /// Returns `Ok(None)` when there is nothing to replay.
    pub fn replay(&self) -> Result<Option<VoiceHandle>> {
        let Some(buffer) = self.buffer() else {
            return Ok(None);
        };
        self.ensure_context()?;
        self.start_playback(buffer).map(Some)
    }

    /// Stop playback. Returns true if something was audible.
    pub fn stop(&self) -> bool {
        let stopped = lock(&self.playback).stop();
        if stopped {
            self.state.broadcast_event(SessionEvent::PlaybackStopped {
                timestamp: Utc::now(),
            });
        }
        stopped
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.playback).is_playing()
    }

    /// Suspend the output context. The current voice keeps its position and
    /// continues on [`Studio::resume`] or the next generation.
    pub fn pause(&self) -> Result<()> {
        self.context.suspend()?;
        debug!("Output context paused");
        Ok(())
    }

    /// Resume a paused output context
    pub fn resume(&self) -> Result<()> {
        self.ensure_context()
    }

    /// Resolves once the active voice has finished or been stopped
    pub async fn wait_for_playback(&self) {
        while self.is_playing() {
            tokio::time::sleep(PLAYBACK_POLL).await;
        }
    }

    /// Copy the live WAV to `dest`.
    ///
    /// `None` saves to the configured output file; a directory receives the
    /// output file's name. Returns the written path.
    ///
    /// # Errors
    /// `Error::NoAudio` when no WAV is live.
    pub async fn download(&self, dest: Option<&Path>) -> Result<PathBuf> {
        let path = self.download_path(dest);

        let saved = {
            let slot = lock(&self.resources);
            slot.current().map(|resource| resource.save_to(&path))
        };

        let size_bytes = match saved {
            Some(result) => result?,
            None => {
                let err = Error::NoAudio;
                self.state.update(|ui| ui.error = Some(err.user_message())).await;
                return Err(err);
            }
        };

        info!(path = %path.display(), size_bytes, "Audio saved");
        self.state.broadcast_event(SessionEvent::AudioSaved {
            path: path.clone(),
            size_bytes,
            timestamp: Utc::now(),
        });
        Ok(path)
    }

    fn download_path(&self, dest: Option<&Path>) -> PathBuf {
        let default = &self.options.output_file;
        match dest {
            None => default.clone(),
            Some(dir) if dir.is_dir() => {
                let name = default
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
                dir.join(name)
            }
            Some(path) => path.to_path_buf(),
        }
    }

    /// Tear the session down: stop playback, release the WAV, close the
    /// output context. Idempotent; close failures are logged only.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop();
        self.release_resource();
        lock(&self.buffer).take();

        if self.context.state() != ContextState::Closed {
            if let Err(e) = self.context.close() {
                warn!("Failed to close output context: {}", e);
            }
        }

        // A generation may hold the read side; it only matters for display
        if let Ok(mut ui) = self.state.ui.try_write() {
            ui.has_buffer = false;
            ui.resource_url = None;
        }

        self.state.broadcast_event(SessionEvent::SessionClosed {
            timestamp: Utc::now(),
        });
        info!("Studio session closed");
    }
}

impl<C: OutputContext, G: SpeechGenerator> Drop for Studio<C, G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessContext;
    use async_trait::async_trait;

    struct Silence;

    #[async_trait]
    impl SpeechGenerator for Silence {
        async fn generate_speech(&self, _text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>> {
            Ok(vec![0u8; 480])
        }
    }

    fn studio() -> Studio<HeadlessContext, Silence> {
        Studio::new(HeadlessContext::new(24_000), Silence, StudioOptions::default())
    }

    #[test]
    fn test_validate_rules() {
        let studio = studio();
        let voice = default_voice().id;

        let blank = studio.validate("   \n", voice).unwrap_err();
        assert_eq!(blank.to_string(), EMPTY_TEXT);

        let long = "x".repeat(501);
        let too_long = studio.validate(&long, voice).unwrap_err();
        assert_eq!(
            too_long.to_string(),
            "Text exceeds maximum length of 500 characters."
        );

        let exact = "x".repeat(500);
        assert!(studio.validate(&exact, voice).is_ok());

        let unknown = studio.validate("Hi", "nobody").unwrap_err();
        assert_eq!(unknown.to_string(), VOICE_NOT_FOUND);
    }

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(BusyGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_download_path_resolution() {
        let studio = studio();
        let dir = tempfile::TempDir::new().unwrap();

        assert_eq!(studio.download_path(None), PathBuf::from("gemini_speech.wav"));
        assert_eq!(
            studio.download_path(Some(dir.path())),
            dir.path().join("gemini_speech.wav")
        );
        let file = dir.path().join("hello.wav");
        assert_eq!(studio.download_path(Some(&file)), file);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let studio = studio();
        studio.generate_text("Hi").await.unwrap();
        assert_eq!(studio.live_resources(), 1);

        studio.shutdown();
        studio.shutdown();

        assert!(studio.is_closed());
        assert_eq!(studio.live_resources(), 0);
        assert_eq!(studio.context().state(), ContextState::Closed);
    }
}
