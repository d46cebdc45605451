//! Interchange format — the clip/arrangement shape spoken by the generation
//! and export services, and accepted by JSON import.
//!
//! ```json
//! { "bpm": 120,
//!   "tracks": [{"id": "t_piano", "instrument": "Piano", "type": "instrument"}],
//!   "clips": {"clip_t_piano": [{"note": 60, "start": 0, "duration": 1, "velocity": 90, "track_id": "t_piano"}]},
//!   "arrangement": [{"section": "Full", "start_bar": 0, "track_id": "t_piano", "clip_id": "clip_t_piano"}] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Document, NoteEvent, NoteId, Track, TrackId, DEFAULT_VELOCITY};

/// Beats per bar under the assumed 4/4 meter.
pub const BEATS_PER_BAR: f64 = 4.0;

/// Section name used when packing a flat document.
pub const PACKED_SECTION: &str = "Full";

/// Why an interchange document was rejected.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid music data structure: missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid tempo {0}: bpm must be greater than zero")]
    InvalidTempo(f64),
}

/// A note as stored inside a clip, relative to the clip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub note: i64,
    pub start: f64,
    pub duration: f64,
    #[serde(default = "default_velocity")]
    pub velocity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
}

fn default_velocity() -> i64 {
    DEFAULT_VELOCITY as i64
}

/// Placement of a clip on a track at a bar offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementItem {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub start_bar: u32,
    pub track_id: TrackId,
    pub clip_id: String,
}

/// The packed document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    pub bpm: f64,
    pub tracks: Vec<Track>,
    pub clips: BTreeMap<String, Vec<ClipNote>>,
    #[serde(default)]
    pub arrangement: Vec<ArrangementItem>,
}

/// Lenient mirror of [`MusicData`] used to report which field is missing.
#[derive(Deserialize)]
struct RawMusicData {
    bpm: Option<f64>,
    tracks: Option<Vec<Track>>,
    clips: Option<BTreeMap<String, Vec<ClipNote>>>,
    #[serde(default)]
    arrangement: Option<Vec<ArrangementItem>>,
}

impl TryFrom<RawMusicData> for MusicData {
    type Error = ImportError;

    fn try_from(raw: RawMusicData) -> Result<Self, ImportError> {
        let bpm = raw.bpm.ok_or(ImportError::MissingField("bpm"))?;
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(ImportError::InvalidTempo(bpm));
        }
        Ok(Self {
            bpm,
            tracks: raw.tracks.ok_or(ImportError::MissingField("tracks"))?,
            clips: raw.clips.ok_or(ImportError::MissingField("clips"))?,
            arrangement: raw.arrangement.unwrap_or_default(),
        })
    }
}

impl MusicData {
    /// Parse and validate interchange JSON text.
    pub fn from_json(text: &str) -> Result<Self, ImportError> {
        let raw: RawMusicData = serde_json::from_str(text)?;
        raw.try_into()
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ImportError> {
        let raw: RawMusicData = serde_json::from_value(value)?;
        raw.try_into()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Pack a flat note list into one clip per track, all placed at bar 0.
    ///
    /// Tracks without notes get no clip; notes whose track is unknown are dropped.
    pub fn pack(notes: &[NoteEvent], bpm: f64, tracks: &[Track]) -> Self {
        let mut clips = BTreeMap::new();
        let mut arrangement = Vec::new();

        for track in tracks {
            let clip: Vec<ClipNote> = notes
                .iter()
                .filter(|n| n.track == track.id)
                .map(|n| ClipNote {
                    id: Some(n.id.to_string()),
                    note: n.pitch as i64,
                    start: n.start,
                    duration: n.duration,
                    velocity: n.velocity as i64,
                    track_id: Some(n.track.clone()),
                })
                .collect();
            if clip.is_empty() {
                continue;
            }

            let clip_id = format!("clip_{}", track.id);
            arrangement.push(ArrangementItem {
                section: PACKED_SECTION.to_string(),
                start_bar: 0,
                track_id: track.id.clone(),
                clip_id: clip_id.clone(),
            });
            clips.insert(clip_id, clip);
        }

        Self {
            bpm,
            tracks: tracks.to_vec(),
            clips,
            arrangement,
        }
    }

    /// Pack the current state of a document.
    pub fn from_document(document: &Document) -> Self {
        Self::pack(document.notes(), document.bpm(), document.tracks())
    }

    /// Unpack the arrangement into a flat note list with fresh ids.
    ///
    /// Items referring to a missing clip are skipped. Notes without their own
    /// `track_id` inherit the arrangement item's track.
    pub fn flatten(&self, mut alloc_id: impl FnMut() -> NoteId) -> Vec<NoteEvent> {
        let mut notes = Vec::new();
        for item in &self.arrangement {
            let Some(clip) = self.clips.get(&item.clip_id) else {
                continue;
            };
            let offset = item.start_bar as f64 * BEATS_PER_BAR;
            for note in clip {
                let track = note.track_id.clone().unwrap_or_else(|| item.track_id.clone());
                notes.push(NoteEvent::new(
                    alloc_id(),
                    note.note,
                    note.start + offset,
                    note.duration,
                    note.velocity,
                    track,
                ));
            }
        }
        notes
    }
}
