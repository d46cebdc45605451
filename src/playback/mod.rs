//! Playback — transport state over a lookahead note scheduler.
//!
//! The [`Transport`] is driven cooperatively: the front-end calls
//! [`Transport::poll`] every loop iteration and the transport ticks its
//! [`PlaybackScheduler`] whenever the tick interval has elapsed. One
//! scheduler exists per play; stopping or seeking throws it away.

pub mod clock;
pub mod scheduler;

use std::time::{Duration, Instant};

use thiserror::Error;

pub use clock::BeatClock;
pub use scheduler::{PlaybackScheduler, TickReport};

use crate::audio::SoundBackend;
use crate::session::Session;

/// Default scheduling tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(25);
/// Default lookahead window.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(150);
/// Default beats past the last note end before playback stops.
pub const DEFAULT_END_MARGIN: f64 = 0.5;

/// Invalid scheduler timing.
#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("tick interval must be greater than zero")]
    ZeroTick,
    #[error("lookahead ({lookahead:?}) must exceed the tick interval ({tick:?})")]
    LookaheadTooShort { tick: Duration, lookahead: Duration },
}

/// Validated scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    tick: Duration,
    lookahead: Duration,
    end_margin_beats: f64,
}

impl SchedulerConfig {
    /// Build a config. The lookahead must be longer than the tick, otherwise
    /// onsets could fall between two ticks.
    pub fn new(tick: Duration, lookahead: Duration) -> Result<Self, PlaybackError> {
        if tick.is_zero() {
            return Err(PlaybackError::ZeroTick);
        }
        if lookahead <= tick {
            return Err(PlaybackError::LookaheadTooShort { tick, lookahead });
        }
        Ok(Self {
            tick,
            lookahead,
            end_margin_beats: DEFAULT_END_MARGIN,
        })
    }

    /// Replace the end margin (negative values become zero).
    pub fn with_end_margin(mut self, beats: f64) -> Self {
        self.end_margin_beats = beats.max(0.0);
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    pub fn end_margin_beats(&self) -> f64 {
        self.end_margin_beats
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            lookahead: DEFAULT_LOOKAHEAD,
            end_margin_beats: DEFAULT_END_MARGIN,
        }
    }
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
}

/// Play/stop control and the playhead.
#[derive(Debug)]
pub struct Transport {
    config: SchedulerConfig,
    state: PlayState,
    playhead: f64,
    scheduler: Option<PlaybackScheduler>,
    last_tick: Option<Instant>,
}

impl Transport {
    /// Create a stopped transport with the playhead at zero.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: PlayState::Stopped,
            playhead: 0.0,
            scheduler: None,
            last_tick: None,
        }
    }

    /// Start playback from `from`, or from the playhead when `None`.
    ///
    /// The session's audible notes are captured now; edits made while playing
    /// are heard on the next play. Any running playback is stopped first.
    pub fn play(&mut self, session: &Session, backend: &mut dyn SoundBackend, from: Option<f64>) {
        self.stop();

        let start = from.unwrap_or(self.playhead).max(0.0);
        let document = session.document();
        let notes: Vec<_> = document
            .notes()
            .iter()
            .filter(|n| session.is_audible(n))
            .cloned()
            .collect();
        let end_beat = document.end_beat();

        backend.configure_tracks(document.tracks());
        let clock = BeatClock::new(backend.current_time(), start, document.bpm());
        tracing::info!(
            from = start,
            bpm = document.bpm(),
            notes = notes.len(),
            "playback started"
        );

        self.scheduler = Some(PlaybackScheduler::new(notes, end_beat, clock, &self.config));
        self.state = PlayState::Playing;
        self.playhead = start;
        self.last_tick = None;
    }

    /// Stop playback. The playhead stays where it was.
    pub fn stop(&mut self) {
        if self.scheduler.take().is_some() {
            tracing::info!(at = self.playhead, "playback stopped");
        }
        self.state = PlayState::Stopped;
        self.last_tick = None;
    }

    /// Stop and return the playhead to zero.
    pub fn rewind(&mut self) {
        self.stop();
        self.playhead = 0.0;
    }

    /// Move the playhead. While playing, restart from `beat` with a fresh anchor.
    pub fn seek(&mut self, beat: f64, session: &Session, backend: &mut dyn SoundBackend) {
        let beat = beat.max(0.0);
        tracing::info!(to = beat, "seek");
        if self.is_playing() {
            self.play(session, backend, Some(beat));
        } else {
            self.playhead = beat;
        }
    }

    /// Tick if the tick interval has elapsed since the last one.
    pub fn poll(&mut self, backend: &mut dyn SoundBackend) -> Option<TickReport> {
        if !self.is_playing() {
            return None;
        }
        let due = self
            .last_tick
            .map_or(true, |t| t.elapsed() >= self.config.tick());
        if !due {
            return None;
        }
        self.last_tick = Some(Instant::now());
        self.tick(backend)
    }

    /// Run one scheduler tick now.
    ///
    /// When the piece has finished, playback stops and the playhead returns
    /// to zero.
    pub fn tick(&mut self, backend: &mut dyn SoundBackend) -> Option<TickReport> {
        let scheduler = self.scheduler.as_mut()?;
        let report = scheduler.tick(backend.current_time(), backend)?;
        self.playhead = report.beat.max(0.0);
        if report.finished {
            tracing::info!(at = report.beat, "playback finished");
            self.stop();
            self.playhead = 0.0;
        }
        Some(report)
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Current playhead, in beats.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> Option<&PlaybackScheduler> {
        self.scheduler.as_ref()
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentBackend;
    use crate::document::{NoteEvent, TrackId};

    fn session_with_note(start: f64, duration: f64) -> Session {
        let mut session = Session::default();
        let id = session.document_mut().alloc_id();
        session.commit_notes(vec![NoteEvent::new(
            id,
            60,
            start,
            duration,
            100,
            TrackId::new("t_piano"),
        )]);
        session
    }

    #[test]
    fn config_rejects_short_lookahead() {
        let err = SchedulerConfig::new(Duration::from_millis(50), Duration::from_millis(50));
        assert!(matches!(err, Err(PlaybackError::LookaheadTooShort { .. })));
        assert_eq!(
            SchedulerConfig::new(Duration::ZERO, Duration::from_millis(50)),
            Err(PlaybackError::ZeroTick)
        );
        assert!(SchedulerConfig::new(Duration::from_millis(25), Duration::from_millis(150)).is_ok());
    }

    #[test]
    fn default_timing() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick(), Duration::from_millis(25));
        assert_eq!(config.lookahead(), Duration::from_millis(150));
        assert_eq!(config.end_margin_beats(), 0.5);
        assert_eq!(config.with_end_margin(-1.0).end_margin_beats(), 0.0);
    }

    #[test]
    fn initial_state() {
        let t = Transport::default();
        assert_eq!(t.state(), PlayState::Stopped);
        assert_eq!(t.playhead(), 0.0);
        assert!(t.scheduler().is_none());
    }

    #[test]
    fn play_and_stop() {
        let session = session_with_note(0.0, 1.0);
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        t.play(&session, &mut backend, Some(2.0));
        assert!(t.is_playing());
        assert_eq!(t.playhead(), 2.0);
        t.stop();
        assert!(!t.is_playing());
        assert_eq!(t.playhead(), 2.0);
        assert!(t.scheduler().is_none());
    }

    #[test]
    fn play_without_position_resumes_from_playhead() {
        let session = session_with_note(0.0, 8.0);
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        t.seek(3.0, &session, &mut backend);
        assert!(!t.is_playing());
        t.play(&session, &mut backend, None);
        let origin = t.scheduler().map(|s| s.clock().beat_origin());
        assert_eq!(origin, Some(3.0));
    }

    #[test]
    fn seek_while_playing_restarts() {
        let session = session_with_note(0.0, 8.0);
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        t.play(&session, &mut backend, Some(0.0));
        t.seek(4.0, &session, &mut backend);
        assert!(t.is_playing());
        let origin = t.scheduler().map(|s| s.clock().beat_origin());
        assert_eq!(origin, Some(4.0));
    }

    #[test]
    fn rewind_stops_and_resets() {
        let session = session_with_note(0.0, 8.0);
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        t.play(&session, &mut backend, Some(5.0));
        t.rewind();
        assert!(!t.is_playing());
        assert_eq!(t.playhead(), 0.0);
    }

    #[test]
    fn finishing_resets_playhead() {
        // Starting past the end finishes on the first tick.
        let session = session_with_note(0.0, 1.0);
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        t.play(&session, &mut backend, Some(10.0));
        let report = t.tick(&mut backend).unwrap();
        assert!(report.finished);
        assert!(!t.is_playing());
        assert_eq!(t.playhead(), 0.0);
    }

    #[test]
    fn poll_is_noop_when_stopped() {
        let mut backend = SilentBackend::new();
        let mut t = Transport::default();
        assert!(t.poll(&mut backend).is_none());
    }
}
