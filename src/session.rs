//! Session — the explicit state object every editing surface works through.
//!
//! A [`Session`] owns the document, the selection, the undo history and the
//! small amount of UI state that editing depends on (active track, hidden
//! tracks, snap, tool). Gesture and velocity editors borrow it mutably; the
//! transport reads it when playback starts.

use std::collections::BTreeSet;

use crate::document::{
    clamp_bpm, Document, ImportError, MusicData, NoteEvent, NoteId, Selection, Track, TrackId,
    MIN_DURATION,
};
use crate::history::History;
use crate::remote::{ComposeService, RemoteError};

/// Snap quantum a new session starts with (1/16).
pub const DEFAULT_SNAP: f64 = 0.25;

/// Duration of a freshly drawn note when snapping is off.
pub const FREE_DRAW_DURATION: f64 = 0.25;

/// Pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Draw,
    Select,
    Erase,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Tool::Draw => "DRAW",
            Tool::Select => "SELECT",
            Tool::Erase => "ERASE",
        }
    }
}

/// Whether a remote call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteStatus {
    #[default]
    Idle,
    Generating,
    Exporting,
}

/// Editing session state.
#[derive(Debug, Clone)]
pub struct Session {
    document: Document,
    selection: Selection,
    history: History,
    active_track: TrackId,
    hidden: BTreeSet<TrackId>,
    snap: f64,
    tool: Tool,
    clipboard: Vec<NoteEvent>,
    remote: RemoteStatus,
}

impl Session {
    /// Open a session on `document`. Its notes become the first history entry.
    pub fn new(document: Document) -> Self {
        let history = History::new(document.notes().to_vec());
        let active_track = first_track(document.tracks());
        Self {
            document,
            selection: Selection::new(),
            history,
            active_track,
            hidden: BTreeSet::new(),
            snap: DEFAULT_SNAP,
            tool: Tool::default(),
            clipboard: Vec::new(),
            remote: RemoteStatus::Idle,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable document access for in-place previews. Changes made here are
    /// not undoable until [`Session::commit_current`] is called.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active_track(&self) -> &TrackId {
        &self.active_track
    }

    pub fn snap(&self) -> f64 {
        self.snap
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn remote_status(&self) -> RemoteStatus {
        self.remote
    }

    pub fn clipboard(&self) -> &[NoteEvent] {
        &self.clipboard
    }

    /// Smallest duration a drag may produce: one snap quantum, or
    /// [`MIN_DURATION`] when snapping is off.
    pub fn snap_unit(&self) -> f64 {
        if self.snap > 0.0 {
            self.snap
        } else {
            MIN_DURATION
        }
    }

    /// Duration given to a freshly drawn note.
    pub fn draw_duration(&self) -> f64 {
        if self.snap > 0.0 {
            self.snap
        } else {
            FREE_DRAW_DURATION
        }
    }

    // ------------------------------------------------------------------
    // Commits
    // ------------------------------------------------------------------

    /// Replace the note list and record one history snapshot.
    pub fn commit_notes(&mut self, notes: Vec<NoteEvent>) {
        self.history.commit(notes.clone());
        self.document.replace_notes(notes);
        self.selection.prune(&self.document);
    }

    /// Record the document's current notes as a snapshot. Used after
    /// in-place edits such as velocity drags.
    pub fn commit_current(&mut self) {
        self.history.commit(self.document.notes().to_vec());
        self.selection.prune(&self.document);
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.document.replace_notes(snapshot.to_vec());
        self.selection.prune(&self.document);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.document.replace_notes(snapshot.to_vec());
        self.selection.prune(&self.document);
        true
    }

    /// Delete one note. Returns false if it does not exist.
    pub fn delete_note(&mut self, id: NoteId) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        let notes = self
            .document
            .notes()
            .iter()
            .filter(|n| n.id != id)
            .cloned()
            .collect();
        self.commit_notes(notes);
        true
    }

    /// Delete every selected note. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let before = self.document.notes().len();
        let notes: Vec<NoteEvent> = self
            .document
            .notes()
            .iter()
            .filter(|n| !self.selection.contains(n.id))
            .cloned()
            .collect();
        let removed = before - notes.len();
        self.commit_notes(notes);
        self.selection.clear();
        removed
    }

    /// Copy the selected notes to the clipboard. Returns how many were copied.
    pub fn copy_selected(&mut self) -> usize {
        self.clipboard = self
            .document
            .notes()
            .iter()
            .filter(|n| self.selection.contains(n.id))
            .cloned()
            .collect();
        self.clipboard.len()
    }

    /// Paste the clipboard with its earliest note at `beat`.
    ///
    /// Pasted notes get fresh ids, keep their relative offsets and tracks, and
    /// become the selection. Returns how many notes were pasted.
    pub fn paste_at(&mut self, beat: f64) -> usize {
        if self.clipboard.is_empty() {
            return 0;
        }
        let origin = self
            .clipboard
            .iter()
            .map(|n| n.start)
            .fold(f64::INFINITY, f64::min);

        let mut notes = self.document.notes().to_vec();
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        for src in &self.clipboard {
            let note = NoteEvent::new(
                self.document.alloc_id(),
                src.pitch as i64,
                beat + (src.start - origin),
                src.duration,
                src.velocity as i64,
                src.track.clone(),
            );
            pasted.push(note.id);
            notes.push(note);
        }
        self.commit_notes(notes);
        self.selection.set(pasted.iter().copied());
        pasted.len()
    }

    // ------------------------------------------------------------------
    // Document boundary
    // ------------------------------------------------------------------

    /// Merge an interchange document: replace tempo, replace tracks when the
    /// incoming list is non-empty, and commit the flattened notes.
    ///
    /// Returns the number of notes committed.
    pub fn apply_music_data(&mut self, data: &MusicData) -> usize {
        self.document.set_bpm(data.bpm);
        if !data.tracks.is_empty() {
            self.document.set_tracks(data.tracks.clone());
            self.active_track = first_track(&data.tracks);
            let tracks = self.document.tracks();
            self.hidden.retain(|id| tracks.iter().any(|t| &t.id == id));
        }
        let document = &mut self.document;
        let notes = data.flatten(|| document.alloc_id());
        let count = notes.len();
        self.commit_notes(notes);
        self.selection.clear();
        count
    }

    /// Validate and apply interchange JSON. The document is unchanged on error.
    pub fn import_json(&mut self, text: &str) -> Result<usize, ImportError> {
        let data = MusicData::from_json(text).map_err(|e| {
            tracing::warn!(error = %e, "rejected import");
            e
        })?;
        let count = self.apply_music_data(&data);
        tracing::info!(notes = count, bpm = data.bpm, "imported document");
        Ok(count)
    }

    /// Pack the current document into the interchange shape.
    pub fn to_music_data(&self) -> MusicData {
        MusicData::from_document(&self.document)
    }

    /// Pretty-printed interchange JSON of the current document.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        self.to_music_data().to_json_pretty()
    }

    /// Ask `service` for a new piece and apply it.
    pub fn generate(
        &mut self,
        service: &dyn ComposeService,
        prompt: &str,
    ) -> Result<usize, RemoteError> {
        self.remote = RemoteStatus::Generating;
        let result = service.generate(prompt);
        self.remote = RemoteStatus::Idle;

        match result {
            Ok(data) => {
                let count = self.apply_music_data(&data);
                tracing::info!(notes = count, bpm = data.bpm, "applied generated piece");
                Ok(count)
            }
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                Err(e)
            }
        }
    }

    /// Export the current document through `service`, returning the MIDI bytes.
    pub fn export(&mut self, service: &dyn ComposeService) -> Result<Vec<u8>, RemoteError> {
        self.remote = RemoteStatus::Exporting;
        let result = service.export(&self.to_music_data());
        self.remote = RemoteStatus::Idle;

        match &result {
            Ok(bytes) => tracing::info!(bytes = bytes.len(), "exported document"),
            Err(e) => tracing::error!(error = %e, "export failed"),
        }
        result
    }

    // ------------------------------------------------------------------
    // Tracks and settings
    // ------------------------------------------------------------------

    /// Make `id` the active track. Returns false for an unknown track.
    pub fn set_active_track(&mut self, id: &TrackId) -> bool {
        if self.document.track(id).is_none() {
            return false;
        }
        self.active_track = id.clone();
        true
    }

    /// Advance the active track to the next one in list order, wrapping.
    pub fn cycle_active_track(&mut self) {
        let tracks = self.document.tracks();
        if tracks.is_empty() {
            return;
        }
        let next = tracks
            .iter()
            .position(|t| t.id == self.active_track)
            .map_or(0, |i| (i + 1) % tracks.len());
        self.active_track = tracks[next].id.clone();
    }

    /// Flip a track's mute flag. Returns the new state, or `None` if unknown.
    pub fn toggle_mute(&mut self, id: &TrackId) -> Option<bool> {
        let track = self.document.track_mut(id)?;
        track.muted = !track.muted;
        Some(track.muted)
    }

    /// Flip a track's hidden flag. Returns the new state, or `None` if unknown.
    pub fn toggle_hidden(&mut self, id: &TrackId) -> Option<bool> {
        self.document.track(id)?;
        if self.hidden.remove(id) {
            Some(false)
        } else {
            self.hidden.insert(id.clone());
            Some(true)
        }
    }

    pub fn is_hidden(&self, id: &TrackId) -> bool {
        self.hidden.contains(id)
    }

    /// Whether `note` should sound: its track exists, is not muted and not hidden.
    pub fn is_audible(&self, note: &NoteEvent) -> bool {
        !self.hidden.contains(&note.track)
            && self
                .document
                .track(&note.track)
                .is_some_and(|t| !t.muted)
    }

    /// Notes whose track is not hidden, in document order.
    pub fn visible_notes(&self) -> impl Iterator<Item = &NoteEvent> + '_ {
        self.document
            .notes()
            .iter()
            .filter(move |n| !self.hidden.contains(&n.track))
    }

    /// Notes the pointer can grab: visible and on the active track.
    pub fn editable_notes(&self) -> impl Iterator<Item = &NoteEvent> + '_ {
        self.visible_notes()
            .filter(move |n| n.track == self.active_track)
    }

    /// Set the tempo from an interactive control, clamped to
    /// `[MIN_BPM, MAX_BPM]`. Imported tempos bypass the clamp.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.document.set_bpm(clamp_bpm(bpm));
    }

    /// Set the snap quantum. Negative values turn snapping off.
    pub fn set_snap(&mut self, quantum: f64) {
        self.snap = if quantum.is_finite() { quantum.max(0.0) } else { 0.0 };
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

fn first_track(tracks: &[Track]) -> TrackId {
    tracks
        .first()
        .map(|t| t.id.clone())
        .unwrap_or_else(|| TrackId::new("t_piano"))
}
