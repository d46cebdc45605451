//! Sound backends — the thin dispatch contract the transport and editors use.
//!
//! The core only ever talks to a [`SoundBackend`]. [`AudioEngine`] is the
//! cpal-backed synth; [`SilentBackend`] keeps time but makes no sound, and is
//! what everything degrades to when no output device is available.

pub mod callback;
pub mod command;
pub mod engine;
pub mod voice;

use std::time::Instant;

use thiserror::Error;

use crate::document::{Track, TrackId};

pub use command::AudioCommand;
pub use engine::AudioEngine;
pub use voice::VoiceKind;

/// Audio engine errors.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The audio thread is not draining commands fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Per-note playback options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOptions {
    /// Linear gain, `velocity / 127`.
    pub gain: f32,
}

impl NoteOptions {
    pub fn from_velocity(velocity: u8) -> Self {
        Self {
            gain: velocity as f32 / 127.0,
        }
    }
}

/// Handle to a scheduled note, used to end it at a chosen time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseHandle(pub u64);

/// What the core needs from an audio output.
///
/// Times are seconds on the backend's own clock ([`SoundBackend::current_time`]).
pub trait SoundBackend {
    /// Prepare instruments. Returns whether the backend is usable.
    fn preload(&mut self) -> bool;

    fn is_ready(&self) -> bool;

    /// The audio clock, in seconds. Monotonic.
    fn current_time(&self) -> f64;

    /// Fire-and-forget audition of a pitch on a track's instrument.
    fn preview_note(&mut self, pitch: u8, track: &TrackId);

    /// Start a note at `at`. Returns a handle when the note can be released.
    fn schedule_note(
        &mut self,
        pitch: u8,
        track: &TrackId,
        at: f64,
        options: NoteOptions,
    ) -> Option<ReleaseHandle>;

    /// End a previously scheduled note at `at`.
    fn release(&mut self, handle: ReleaseHandle, at: f64);

    /// Hint describing the current track set.
    fn configure_tracks(&mut self, _tracks: &[Track]) {}
}

/// A backend that keeps wall-clock time and discards every note.
#[derive(Debug, Clone)]
pub struct SilentBackend {
    epoch: Instant,
    ready: bool,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            ready: true,
        }
    }
}

impl Default for SilentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundBackend for SilentBackend {
    fn preload(&mut self) -> bool {
        self.ready = true;
        true
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn preview_note(&mut self, _pitch: u8, _track: &TrackId) {}

    fn schedule_note(
        &mut self,
        _pitch: u8,
        _track: &TrackId,
        _at: f64,
        _options: NoteOptions,
    ) -> Option<ReleaseHandle> {
        None
    }

    fn release(&mut self, _handle: ReleaseHandle, _at: f64) {}
}

/// Open the default output device, falling back to [`SilentBackend`].
/// Start the audio engine on the default output device.
pub fn open_engine() -> Result<AudioEngine, AudioError> {
    let mut engine = AudioEngine::new()?;
    engine.preload();
    tracing::info!(
        sample_rate = engine.sample_rate(),
        channels = engine.channels(),
        "audio engine started"
    );
    Ok(engine)
}

/// The audio engine when an output device exists, a silent clock otherwise.
pub fn open_default_backend() -> Box<dyn SoundBackend> {
    match open_engine() {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "audio unavailable, continuing silently");
            Box::new(SilentBackend::new())
        }
    }
}
