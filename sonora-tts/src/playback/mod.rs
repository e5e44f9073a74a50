//! Playback control

pub mod controller;

pub use controller::PlaybackController;
