//! Shared studio state
//!
//! The UI-facing view of a studio session (input text, selected voice,
//! loading flag, last error, audio availability) plus the event broadcaster.
//! Front ends read snapshots; only the studio writes.

use serde::Serialize;
use sonora_common::events::SessionEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

/// Everything a front end renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiState {
    /// Current input text
    pub text: String,
    /// Selected voice profile id
    pub voice_id: String,
    /// A generation is in flight
    pub loading: bool,
    /// Single user-visible error message
    pub error: Option<String>,
    /// A decoded buffer is available for replay
    pub has_buffer: bool,
    /// Locator of the downloadable WAV, if any
    pub resource_url: Option<String>,
    pub max_text_length: usize,
}

impl UiState {
    pub fn new(voice_id: impl Into<String>, max_text_length: usize) -> Self {
        Self {
            text: String::new(),
            voice_id: voice_id.into(),
            loading: false,
            error: None,
            has_buffer: false,
            resource_url: None,
            max_text_length,
        }
    }

    pub fn has_resource(&self) -> bool {
        self.resource_url.is_some()
    }

    /// Characters remaining before the limit; negative once over it
    pub fn chars_left(&self) -> i64 {
        self.max_text_length as i64 - self.text.chars().count() as i64
    }
}

/// Shared state accessible by the studio and its front ends
pub struct SharedState {
    pub ui: RwLock<UiState>,

    /// Event broadcaster for session listeners
    pub event_tx: broadcast::Sender<SessionEvent>,

    /// Successful generations since startup
    pub generations_total: AtomicU64,
}

impl SharedState {
    pub fn new(initial: UiState) -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            ui: RwLock::new(initial),
            event_tx,
            generations_total: AtomicU64::new(0),
        }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: SessionEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Copy of the current UI state
    pub async fn snapshot(&self) -> UiState {
        self.ui.read().await.clone()
    }

    /// Mutate the UI state under the write lock
    pub async fn update<R>(&self, f: impl FnOnce(&mut UiState) -> R) -> R {
        let mut ui = self.ui.write().await;
        f(&mut ui)
    }

    pub fn increment_generations(&self) -> u64 {
        self.generations_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn generations(&self) -> u64 {
        self.generations_total.load(Ordering::Relaxed)
    }
}
