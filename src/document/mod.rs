//! Document store — notes, tracks, tempo, and the selection over them.
//!
//! Editing always works on the flat note list held by [`Document`]. The
//! clip/arrangement shape used by the generation and export services lives in
//! [`interchange`] and is only touched at the document boundary.

pub mod interchange;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use interchange::{ArrangementItem, ClipNote, ImportError, MusicData, BEATS_PER_BAR};

/// Tempo used for a fresh document.
pub const DEFAULT_BPM: f64 = 120.0;
/// Lowest tempo accepted by editing.
pub const MIN_BPM: f64 = 40.0;
/// Highest tempo accepted by editing.
pub const MAX_BPM: f64 = 300.0;
/// Velocity for freshly drawn notes.
pub const DEFAULT_VELOCITY: u8 = 90;
/// Shortest note duration, in beats, when no snap quantum applies.
pub const MIN_DURATION: f64 = 0.125;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of a MIDI pitch, e.g. `60` → `"C4"`.
pub fn note_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// Whether a pitch falls on a black piano key.
pub fn is_black_key(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

/// Session-unique note identifier. Never reused once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{:06x}", self.0)
    }
}

/// Identifies a track, e.g. `t_piano`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Track category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Instrument,
    Percussion,
}

/// A track: the owner of a set of notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Display name.
    #[serde(rename = "instrument")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub muted: bool,
}

impl Track {
    pub fn new(id: &str, name: &str, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(id),
            name: name.to_string(),
            kind,
            muted: false,
        }
    }
}

/// The track set a new session starts with.
pub fn default_tracks() -> Vec<Track> {
    vec![
        Track::new("t_piano", "Piano", TrackKind::Instrument),
        Track::new("t_bass", "Finger Bass", TrackKind::Instrument),
        Track::new("t_kick", "Kick", TrackKind::Percussion),
        Track::new("t_snare", "Snare", TrackKind::Percussion),
        Track::new("t_hat", "HiHat", TrackKind::Percussion),
    ]
}

/// A single note on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub id: NoteId,
    pub pitch: u8,
    /// Onset in beats, `>= 0`.
    pub start: f64,
    /// Length in beats, `> 0`.
    pub duration: f64,
    pub velocity: u8,
    pub track: TrackId,
}

impl NoteEvent {
    /// Build a note, clamping every field into range.
    pub fn new(
        id: NoteId,
        pitch: i64,
        start: f64,
        duration: f64,
        velocity: i64,
        track: TrackId,
    ) -> Self {
        Self {
            id,
            pitch: pitch.clamp(0, 127) as u8,
            start: if start.is_finite() { start.max(0.0) } else { 0.0 },
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                MIN_DURATION
            },
            velocity: velocity.clamp(1, 127) as u8,
            track,
        }
    }

    /// End of the note in beats.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Temporal centre, where the velocity stem is drawn.
    pub fn center(&self) -> f64 {
        self.start + self.duration / 2.0
    }
}

/// Notes, tracks and tempo. Owns note id allocation.
#[derive(Debug, Clone)]
pub struct Document {
    notes: Vec<NoteEvent>,
    tracks: Vec<Track>,
    bpm: f64,
    next_id: u64,
}

impl Document {
    pub fn new(tracks: Vec<Track>, bpm: f64) -> Self {
        Self {
            notes: Vec::new(),
            tracks,
            bpm: if valid_bpm(bpm) { bpm } else { DEFAULT_BPM },
            next_id: 1,
        }
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo as given. Non-finite or non-positive values are
    /// rejected and leave the tempo unchanged.
    pub fn set_bpm(&mut self, bpm: f64) -> bool {
        if !valid_bpm(bpm) {
            return false;
        }
        self.bpm = bpm;
        true
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    /// Allocate a fresh note id.
    pub fn alloc_id(&mut self) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn note(&self, id: NoteId) -> Option<&NoteEvent> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    pub fn track_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.id == id)
    }

    /// Mutable access to one note, for in-place edits that are committed later.
    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut NoteEvent> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    /// Replace the whole note list. Id allocation stays ahead of every id present.
    pub fn replace_notes(&mut self, notes: Vec<NoteEvent>) {
        if let Some(max) = notes.iter().map(|n| n.id.0).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        self.notes = notes;
    }

    /// Latest note end, in beats. Zero for an empty document.
    pub fn end_beat(&self) -> f64 {
        self.notes.iter().map(NoteEvent::end).fold(0.0, f64::max)
    }

    /// Number of notes owned by a track.
    pub fn note_count(&self, track: &TrackId) -> usize {
        self.notes.iter().filter(|n| &n.track == track).count()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(default_tracks(), DEFAULT_BPM)
    }
}

fn valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

/// Clamp a tempo into `[MIN_BPM, MAX_BPM]`, the range the tempo controls offer.
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

/// The set of selected notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: BTreeSet<NoteId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.ids.iter().copied()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Collapse the selection to a single note.
    pub fn select_only(&mut self, id: NoteId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    pub fn set(&mut self, ids: impl IntoIterator<Item = NoteId>) {
        self.ids = ids.into_iter().collect();
    }

    /// Drop ids that no longer exist in `document`.
    pub fn prune(&mut self, document: &Document) {
        self.ids.retain(|id| document.contains(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piano() -> TrackId {
        TrackId::new("t_piano")
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(0), "C-1");
    }

    #[test]
    fn black_keys() {
        assert!(is_black_key(61));
        assert!(!is_black_key(60));
        assert!(is_black_key(70));
    }

    #[test]
    fn note_constructor_clamps() {
        let n = NoteEvent::new(NoteId(1), 200, -3.0, 0.0, 0, piano());
        assert_eq!(n.pitch, 127);
        assert_eq!(n.start, 0.0);
        assert_eq!(n.duration, MIN_DURATION);
        assert_eq!(n.velocity, 1);

        let n = NoteEvent::new(NoteId(2), -5, f64::NAN, -1.0, 300, piano());
        assert_eq!(n.pitch, 0);
        assert_eq!(n.start, 0.0);
        assert_eq!(n.duration, MIN_DURATION);
        assert_eq!(n.velocity, 127);
    }

    #[test]
    fn default_document() {
        let doc = Document::default();
        assert!(doc.notes().is_empty());
        assert_eq!(doc.tracks().len(), 5);
        assert_eq!(doc.bpm(), DEFAULT_BPM);
        assert_eq!(doc.tracks()[2].kind, TrackKind::Percussion);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut doc = Document::default();
        let a = doc.alloc_id();
        let b = doc.alloc_id();
        assert_ne!(a, b);

        doc.replace_notes(vec![NoteEvent::new(NoteId(40), 60, 0.0, 1.0, 90, piano())]);
        let c = doc.alloc_id();
        assert!(c.0 > 40);
    }

    #[test]
    fn set_bpm_keeps_any_positive_tempo() {
        let mut doc = Document::default();
        assert!(doc.set_bpm(30.0));
        assert_eq!(doc.bpm(), 30.0);
        assert!(doc.set_bpm(480.0));
        assert_eq!(doc.bpm(), 480.0);
        assert!(!doc.set_bpm(0.0));
        assert!(!doc.set_bpm(-5.0));
        assert!(!doc.set_bpm(f64::NAN));
        assert_eq!(doc.bpm(), 480.0);
    }

    #[test]
    fn clamp_bpm_bounds() {
        assert_eq!(clamp_bpm(10.0), MIN_BPM);
        assert_eq!(clamp_bpm(1000.0), MAX_BPM);
        assert_eq!(clamp_bpm(97.0), 97.0);
        assert_eq!(clamp_bpm(f64::NAN), DEFAULT_BPM);
    }

    #[test]
    fn end_beat_is_latest_note_end() {
        let mut doc = Document::default();
        assert_eq!(doc.end_beat(), 0.0);
        doc.replace_notes(vec![
            NoteEvent::new(NoteId(1), 60, 0.0, 4.0, 90, piano()),
            NoteEvent::new(NoteId(2), 62, 2.0, 1.0, 90, piano()),
        ]);
        assert_eq!(doc.end_beat(), 4.0);
    }

    #[test]
    fn selection_prunes_deleted_notes() {
        let mut doc = Document::default();
        doc.replace_notes(vec![
            NoteEvent::new(NoteId(1), 60, 0.0, 1.0, 90, piano()),
            NoteEvent::new(NoteId(2), 62, 1.0, 1.0, 90, piano()),
        ]);
        let mut sel = Selection::new();
        sel.set([NoteId(1), NoteId(2), NoteId(99)]);
        sel.prune(&doc);
        assert_eq!(sel.len(), 2);

        doc.replace_notes(vec![NoteEvent::new(NoteId(2), 62, 1.0, 1.0, 90, piano())]);
        sel.prune(&doc);
        assert!(!sel.contains(NoteId(1)));
        assert!(sel.contains(NoteId(2)));
    }

    #[test]
    fn track_serializes_with_interchange_names() {
        let track = Track::new("t_kick", "Kick", TrackKind::Percussion);
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["id"], "t_kick");
        assert_eq!(json["instrument"], "Kick");
        assert_eq!(json["type"], "percussion");
        assert!(json.get("muted").is_none());
    }

    #[test]
    fn note_counts_per_track() {
        let mut doc = Document::default();
        doc.replace_notes(vec![
            NoteEvent::new(NoteId(1), 60, 0.0, 1.0, 90, piano()),
            NoteEvent::new(NoteId(2), 36, 0.0, 1.0, 90, TrackId::new("t_kick")),
            NoteEvent::new(NoteId(3), 64, 1.0, 1.0, 90, piano()),
        ]);
        assert_eq!(doc.note_count(&piano()), 2);
        assert_eq!(doc.note_count(&TrackId::new("t_kick")), 1);
        assert_eq!(doc.note_count(&TrackId::new("t_bass")), 0);
    }
}
