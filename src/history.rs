//! Edit history — a capped ring of full note-list snapshots with a cursor.
//!
//! Every committed edit pushes a complete copy of the note list. Undo and redo
//! move the cursor and hand back the snapshot under it; the caller restores it.

use std::collections::VecDeque;

use crate::document::NoteEvent;

/// Maximum number of snapshots retained.
pub const MAX_HISTORY: usize = 50;

/// Snapshot log. `log[cursor]` always mirrors the live note list.
#[derive(Debug, Clone)]
pub struct History {
    log: VecDeque<Vec<NoteEvent>>,
    cursor: usize,
}

impl History {
    /// Start a history whose first entry is `initial`.
    pub fn new(initial: Vec<NoteEvent>) -> Self {
        let mut log = VecDeque::with_capacity(MAX_HISTORY);
        log.push_back(initial);
        Self { log, cursor: 0 }
    }

    /// Record a new snapshot. Discards any redo branch and evicts the oldest
    /// entry once the log is full.
    pub fn commit(&mut self, snapshot: Vec<NoteEvent>) {
        self.log.truncate(self.cursor + 1);
        self.log.push_back(snapshot);
        if self.log.len() > MAX_HISTORY {
            self.log.pop_front();
        }
        self.cursor = self.log.len() - 1;
    }

    /// Step back. Returns the snapshot to restore, if any.
    pub fn undo(&mut self) -> Option<&[NoteEvent]> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.log.get(self.cursor).map(Vec::as_slice)
    }

    /// Step forward. Returns the snapshot to restore, if any.
    pub fn redo(&mut self) -> Option<&[NoteEvent]> {
        if self.cursor + 1 >= self.log.len() {
            return None;
        }
        self.cursor += 1;
        self.log.get(self.cursor).map(Vec::as_slice)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.log.len()
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> &[NoteEvent] {
        self.log.get(self.cursor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Always false: a history holds at least its initial snapshot.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
