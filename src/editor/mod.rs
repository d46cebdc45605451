//! Gesture editor — turns pointer input on the note grid into note edits.
//!
//! A gesture starts on pointer-down, previews on pointer-move and commits on
//! pointer-up. While a gesture is active the committed document is untouched;
//! [`GestureEditor::ghosts`] exposes the provisional notes for rendering.
//! Each commit records exactly one history snapshot.

pub mod velocity;

pub use velocity::{VelocityEditor, VelocityLane};

use crate::audio::SoundBackend;
use crate::document::{NoteEvent, NoteId, DEFAULT_VELOCITY};
use crate::geometry::{snap, GridGeometry};
use crate::session::{Session, Tool};

/// Distance, in pixels, from a note's right edge that grabs it for resizing.
pub const DEFAULT_EDGE_MARGIN: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// A pointer event in grid pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
    pub button: PointerButton,
}

impl Pointer {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    pub fn secondary(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            button: PointerButton::Secondary,
        }
    }
}

/// The active gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    /// A new note being stretched out from `anchor_beat`.
    Drawing {
        note_id: NoteId,
        anchor_beat: f64,
        provisional: NoteEvent,
    },
    /// The captured notes, as they were at pointer-down, and the shared delta.
    Moving {
        grabbed: NoteId,
        captured: Vec<NoteEvent>,
        grab_beat_offset: f64,
        grab_pitch_offset: i32,
        delta_beat: f64,
        delta_pitch: i32,
    },
    Resizing {
        note_id: NoteId,
        origin_start: f64,
        origin_duration: f64,
        provisional_duration: f64,
    },
    /// Rubber-band selection between two pixel corners.
    MarqueeSelecting {
        anchor: (f64, f64),
        cursor: (f64, f64),
    },
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Nothing happened (e.g. pointer-down while a gesture is active).
    Ignored,
    /// A gesture began.
    Started,
    /// The provisional state changed.
    Updated,
    /// A note was deleted immediately.
    Deleted(NoteId),
    /// The gesture was committed to the document.
    Committed,
    /// A marquee finished; the selection now holds this many notes.
    Selected(usize),
}

/// Pointer-driven note editing over a [`GridGeometry`].
#[derive(Debug, Clone)]
pub struct GestureEditor {
    state: GestureState,
    geometry: GridGeometry,
    edge_margin: f64,
}

impl GestureEditor {
    pub fn new(geometry: GridGeometry, edge_margin: f64) -> Self {
        Self {
            state: GestureState::Idle,
            geometry,
            edge_margin,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GridGeometry {
        &mut self.geometry
    }

    /// The grabbable note under a pixel: visible, on the active track, on the
    /// pointer's row and spanning its beat. Overlaps resolve to the last match
    /// in document order.
    pub fn hit_test<'a>(&self, session: &'a Session, x: f64, y: f64) -> Option<&'a NoteEvent> {
        let beat = self.geometry.x_to_beat(x);
        let pitch = self.geometry.y_to_pitch(y);
        session
            .editable_notes()
            .filter(|n| n.pitch as i32 == pitch && beat >= n.start && beat <= n.end())
            .last()
    }

    pub fn pointer_down(
        &mut self,
        session: &mut Session,
        pointer: Pointer,
        backend: &mut dyn SoundBackend,
    ) -> GestureOutcome {
        if !self.is_idle() {
            return GestureOutcome::Ignored;
        }

        let hit = self.hit_test(session, pointer.x, pointer.y).cloned();
        let Some(note) = hit else {
            if pointer.button == PointerButton::Secondary {
                return GestureOutcome::Ignored;
            }
            return match session.tool() {
                Tool::Draw => self.begin_draw(session, pointer, backend),
                Tool::Select => {
                    self.state = GestureState::MarqueeSelecting {
                        anchor: (pointer.x, pointer.y),
                        cursor: (pointer.x, pointer.y),
                    };
                    GestureOutcome::Started
                }
                Tool::Erase => GestureOutcome::Ignored,
            };
        };

        if pointer.button == PointerButton::Secondary || session.tool() == Tool::Erase {
            session.delete_note(note.id);
            tracing::debug!(id = %note.id, "deleted note");
            return GestureOutcome::Deleted(note.id);
        }

        let right_edge = self.geometry.beat_to_x(note.end());
        if (pointer.x - right_edge).abs() < self.edge_margin {
            self.state = GestureState::Resizing {
                note_id: note.id,
                origin_start: note.start,
                origin_duration: note.duration,
                provisional_duration: note.duration,
            };
            return GestureOutcome::Started;
        }

        if !session.selection().contains(note.id) {
            session.selection_mut().select_only(note.id);
        }
        let captured: Vec<NoteEvent> = session
            .document()
            .notes()
            .iter()
            .filter(|n| session.selection().contains(n.id))
            .cloned()
            .collect();
        self.state = GestureState::Moving {
            grabbed: note.id,
            captured,
            grab_beat_offset: self.geometry.x_to_beat(pointer.x) - note.start,
            grab_pitch_offset: self.geometry.y_to_pitch(pointer.y) - note.pitch as i32,
            delta_beat: 0.0,
            delta_pitch: 0,
        };
        GestureOutcome::Started
    }

    fn begin_draw(
        &mut self,
        session: &mut Session,
        pointer: Pointer,
        backend: &mut dyn SoundBackend,
    ) -> GestureOutcome {
        let beat = self.geometry.x_to_beat(pointer.x);
        let pitch = self.geometry.clamp_pitch(self.geometry.y_to_pitch(pointer.y));
        let track = session.active_track().clone();
        let id = session.document_mut().alloc_id();
        let provisional = NoteEvent::new(
            id,
            pitch as i64,
            snap(beat, session.snap()),
            session.draw_duration(),
            DEFAULT_VELOCITY as i64,
            track.clone(),
        );

        backend.preview_note(pitch, &track);
        self.state = GestureState::Drawing {
            note_id: id,
            anchor_beat: beat,
            provisional,
        };
        GestureOutcome::Started
    }

    pub fn pointer_move(&mut self, session: &Session, x: f64, y: f64) -> GestureOutcome {
        let beat = self.geometry.x_to_beat(x);
        let quantum = session.snap();
        let unit = session.snap_unit();

        match &mut self.state {
            GestureState::Idle => return GestureOutcome::Ignored,
            GestureState::Drawing {
                anchor_beat,
                provisional,
                ..
            } => {
                provisional.duration = snap(beat - *anchor_beat, quantum).max(unit);
            }
            GestureState::Moving {
                grabbed,
                captured,
                grab_beat_offset,
                grab_pitch_offset,
                delta_beat,
                delta_pitch,
            } => {
                let Some(origin) = captured.iter().find(|n| n.id == *grabbed) else {
                    return GestureOutcome::Ignored;
                };
                *delta_beat = snap(beat - *grab_beat_offset, quantum) - origin.start;
                *delta_pitch =
                    self.geometry.y_to_pitch(y) - *grab_pitch_offset - origin.pitch as i32;
            }
            GestureState::Resizing {
                origin_start,
                provisional_duration,
                ..
            } => {
                *provisional_duration = (snap(beat, quantum) - *origin_start).max(unit);
            }
            GestureState::MarqueeSelecting { cursor, .. } => {
                *cursor = (x, y);
            }
        }
        GestureOutcome::Updated
    }

    /// Finish the active gesture.
    pub fn pointer_up(&mut self, session: &mut Session) -> GestureOutcome {
        let ghosts = self.ghosts(session);
        let state = std::mem::replace(&mut self.state, GestureState::Idle);

        match state {
            GestureState::Idle => GestureOutcome::Ignored,
            GestureState::Drawing {
                note_id,
                provisional,
                ..
            } => {
                let mut notes = session.document().notes().to_vec();
                notes.push(provisional);
                session.commit_notes(notes);
                session.selection_mut().select_only(note_id);
                tracing::debug!(id = %note_id, "committed drawn note");
                GestureOutcome::Committed
            }
            GestureState::Moving { .. } | GestureState::Resizing { .. } => {
                let notes = session
                    .document()
                    .notes()
                    .iter()
                    .map(|n| {
                        ghosts
                            .iter()
                            .find(|g| g.id == n.id)
                            .cloned()
                            .unwrap_or_else(|| n.clone())
                    })
                    .collect();
                session.commit_notes(notes);
                tracing::debug!(notes = ghosts.len(), "committed drag");
                GestureOutcome::Committed
            }
            GestureState::MarqueeSelecting { anchor, cursor } => {
                let ids: Vec<NoteId> = session
                    .visible_notes()
                    .filter(|n| self.intersects(n, anchor, cursor))
                    .map(|n| n.id)
                    .collect();
                let count = ids.len();
                session.selection_mut().set(ids);
                GestureOutcome::Selected(count)
            }
        }
    }

    /// Abandon the active gesture without committing.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Provisional notes for the active gesture, in their previewed position.
    pub fn ghosts(&self, session: &Session) -> Vec<NoteEvent> {
        match &self.state {
            GestureState::Idle | GestureState::MarqueeSelecting { .. } => Vec::new(),
            GestureState::Drawing { provisional, .. } => vec![provisional.clone()],
            GestureState::Moving {
                captured,
                delta_beat,
                delta_pitch,
                ..
            } => captured
                .iter()
                .map(|n| {
                    let mut moved = n.clone();
                    moved.start = (n.start + delta_beat).max(0.0);
                    moved.pitch = self.geometry.clamp_pitch(n.pitch as i32 + delta_pitch);
                    moved
                })
                .collect(),
            GestureState::Resizing {
                note_id,
                provisional_duration,
                ..
            } => session
                .document()
                .note(*note_id)
                .map(|n| {
                    let mut resized = n.clone();
                    resized.duration = *provisional_duration;
                    vec![resized]
                })
                .unwrap_or_default(),
        }
    }

    /// Ids of committed notes that the ghosts stand in for.
    pub fn ghost_ids(&self) -> Vec<NoteId> {
        match &self.state {
            GestureState::Idle | GestureState::MarqueeSelecting { .. } => Vec::new(),
            GestureState::Drawing { note_id, .. } | GestureState::Resizing { note_id, .. } => {
                vec![*note_id]
            }
            GestureState::Moving { captured, .. } => captured.iter().map(|n| n.id).collect(),
        }
    }

    /// Normalized marquee rectangle `(x0, y0, x1, y1)` while selecting.
    pub fn marquee_rect(&self) -> Option<(f64, f64, f64, f64)> {
        match self.state {
            GestureState::MarqueeSelecting { anchor, cursor } => Some(normalize(anchor, cursor)),
            _ => None,
        }
    }

    fn intersects(&self, note: &NoteEvent, a: (f64, f64), b: (f64, f64)) -> bool {
        let (x0, y0, x1, y1) = normalize(a, b);
        let nx0 = self.geometry.beat_to_x(note.start);
        let nx1 = self.geometry.beat_to_x(note.end());
        let ny0 = self.geometry.pitch_to_y(note.pitch);
        let ny1 = ny0 + self.geometry.row_height;
        nx0 < x1 && nx1 > x0 && ny0 < y1 && ny1 > y0
    }
}

impl Default for GestureEditor {
    fn default() -> Self {
        Self::new(GridGeometry::default(), DEFAULT_EDGE_MARGIN)
    }
}

fn normalize(a: (f64, f64), b: (f64, f64)) -> (f64, f64, f64, f64) {
    (a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
}
