//! Lookahead scheduler — dispatches note onsets slightly ahead of the audio clock.
//!
//! Notes are held sorted by onset with a cursor, so each tick only scans the
//! notes that have not been considered yet. A note id is dispatched at most
//! once per scheduler.

use std::collections::HashSet;

use super::clock::BeatClock;
use super::SchedulerConfig;
use crate::audio::{NoteOptions, SoundBackend};
use crate::document::{NoteEvent, NoteId};

/// Onsets earlier than this many seconds before the anchor are skipped.
pub const LATE_TOLERANCE: f64 = 0.05;

/// Seconds added after a note's nominal end before it is released.
pub const RELEASE_TAIL: f64 = 0.1;

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Beat position at the tick's audio time.
    pub beat: f64,
    /// Notes handed to the backend during this tick.
    pub dispatched: usize,
    /// Playback has passed the end of the piece.
    pub finished: bool,
}

/// One playback session's dispatch state.
#[derive(Debug)]
pub struct PlaybackScheduler {
    clock: BeatClock,
    notes: Vec<NoteEvent>,
    cursor: usize,
    dispatched: HashSet<NoteId>,
    finish_beat: f64,
    lookahead: f64,
}

impl PlaybackScheduler {
    /// Build a scheduler over `notes`. Playback finishes once the beat passes
    /// `end_beat` plus the configured margin.
    pub fn new(
        mut notes: Vec<NoteEvent>,
        end_beat: f64,
        clock: BeatClock,
        config: &SchedulerConfig,
    ) -> Self {
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            clock,
            notes,
            cursor: 0,
            dispatched: HashSet::new(),
            finish_beat: end_beat + config.end_margin_beats(),
            lookahead: config.lookahead().as_secs_f64(),
        }
    }

    /// Advance to `audio_now`, dispatching every onset inside the lookahead
    /// window. Returns `None` while the backend is not ready.
    pub fn tick(&mut self, audio_now: f64, backend: &mut dyn SoundBackend) -> Option<TickReport> {
        if !backend.is_ready() {
            return None;
        }

        let horizon = audio_now + self.lookahead;
        let earliest = self.clock.audio_origin() - LATE_TOLERANCE;
        let spb = self.clock.seconds_per_beat();
        let mut dispatched = 0;

        while let Some(note) = self.notes.get(self.cursor) {
            let onset = self.clock.time_of(note.start);
            if onset > horizon {
                break;
            }
            self.cursor += 1;
            if onset < earliest || !self.dispatched.insert(note.id) {
                continue;
            }

            let at = onset.max(audio_now);
            let release = onset + note.duration * spb + RELEASE_TAIL;
            let options = NoteOptions::from_velocity(note.velocity);
            if let Some(handle) = backend.schedule_note(note.pitch, &note.track, at, options) {
                backend.release(handle, release);
            }
            tracing::debug!(
                id = %note.id,
                pitch = note.pitch,
                track = %note.track,
                at,
                "dispatched note"
            );
            dispatched += 1;
        }

        let beat = self.clock.beat_at(audio_now);
        Some(TickReport {
            beat,
            dispatched,
            finished: beat >= self.finish_beat,
        })
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    /// Beat at which playback reports completion.
    pub fn finish_beat(&self) -> f64 {
        self.finish_beat
    }

    /// Notes the cursor has not reached yet.
    pub fn remaining(&self) -> usize {
        self.notes.len() - self.cursor
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.len()
    }

    pub fn was_dispatched(&self, id: NoteId) -> bool {
        self.dispatched.contains(&id)
    }
}
