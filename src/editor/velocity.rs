//! Velocity lane — drag a note's stem to change how hard it is played.

use crate::document::{NoteEvent, NoteId};
use crate::session::Session;

/// Beats either side of a note's centre that still grab its stem.
pub const HIT_TOLERANCE: f64 = 0.3;

/// Vertical mapping between lane pixels and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLane {
    pub height: f64,
    pub padding: f64,
}

impl VelocityLane {
    pub fn new(height: f64, padding: f64) -> Self {
        Self { height, padding }
    }

    /// Velocity for a pointer at `y` (0 is the top of the lane).
    pub fn velocity_at(&self, y: f64) -> u8 {
        let span = self.height - 2.0 * self.padding;
        if span <= 0.0 {
            return 1;
        }
        let v = ((self.height - y - self.padding) / span * 127.0).round();
        v.clamp(1.0, 127.0) as u8
    }

    /// Height of a velocity stem, measured up from the lane's baseline.
    pub fn stem_height(&self, velocity: u8) -> f64 {
        velocity as f64 / 127.0 * (self.height - 2.0 * self.padding)
    }
}

impl Default for VelocityLane {
    fn default() -> Self {
        Self::new(80.0, 10.0)
    }
}

/// Direct velocity editing. At most one note is edited at a time.
#[derive(Debug, Clone, Default)]
pub struct VelocityEditor {
    lane: VelocityLane,
    editing: Option<NoteId>,
}

impl VelocityEditor {
    pub fn new(lane: VelocityLane) -> Self {
        Self {
            lane,
            editing: None,
        }
    }

    pub fn lane(&self) -> &VelocityLane {
        &self.lane
    }

    pub fn lane_mut(&mut self) -> &mut VelocityLane {
        &mut self.lane
    }

    /// The note being edited, if any.
    pub fn editing(&self) -> Option<NoteId> {
        self.editing
    }

    /// Visible note whose centre is closest to `beat`, within tolerance.
    /// Equidistant notes resolve to the last in document order.
    pub fn hit_test<'a>(&self, session: &'a Session, beat: f64) -> Option<&'a NoteEvent> {
        session
            .visible_notes()
            .map(|n| (n, (n.center() - beat).abs()))
            .filter(|(_, d)| *d < HIT_TOLERANCE)
            .fold(None, |best: Option<(&NoteEvent, f64)>, (n, d)| match best {
                Some((_, bd)) if bd < d => best,
                _ => Some((n, d)),
            })
            .map(|(n, _)| n)
    }

    /// Grab the stem nearest `beat` and set its velocity from `y`.
    pub fn pointer_down(&mut self, session: &mut Session, beat: f64, y: f64) -> bool {
        let Some(id) = self.hit_test(session, beat).map(|n| n.id) else {
            return false;
        };
        self.editing = Some(id);
        self.apply(session, y);
        true
    }

    pub fn pointer_move(&mut self, session: &mut Session, y: f64) -> bool {
        if self.editing.is_none() {
            return false;
        }
        self.apply(session, y);
        true
    }

    /// Commit the edit as one history snapshot. Also used when the pointer
    /// leaves the lane mid-drag.
    pub fn pointer_up(&mut self, session: &mut Session) -> bool {
        let Some(id) = self.editing.take() else {
            return false;
        };
        session.commit_current();
        tracing::debug!(%id, "committed velocity edit");
        true
    }

    /// Abandon the edit, restoring the note's committed velocity.
    pub fn cancel(&mut self, session: &mut Session) -> bool {
        let Some(id) = self.editing.take() else {
            return false;
        };
        let committed = session
            .history()
            .current()
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.velocity);
        if let (Some(velocity), Some(note)) = (committed, session.document_mut().note_mut(id)) {
            note.velocity = velocity;
        }
        tracing::debug!(%id, "cancelled velocity edit");
        true
    }

    fn apply(&self, session: &mut Session, y: f64) {
        let Some(id) = self.editing else {
            return;
        };
        if let Some(note) = session.document_mut().note_mut(id) {
            note.velocity = self.lane.velocity_at(y);
        }
    }
}
