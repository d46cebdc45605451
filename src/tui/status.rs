//! Status bar — tempo, playhead position, tool, snap, and active track.

use crate::document::BEATS_PER_BAR;
use crate::geometry::snap_label;
use crate::playback::Transport;
use crate::session::{RemoteStatus, Session};

/// Status information for the TUI status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusInfo {
    pub bpm: f64,
    pub playhead: f64,
    pub is_playing: bool,
    pub tool: &'static str,
    pub snap: &'static str,
    pub track_name: String,
    pub note_count: usize,
    pub selected: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    pub remote: RemoteStatus,
}

impl StatusInfo {
    pub fn capture(session: &Session, transport: &Transport) -> Self {
        let document = session.document();
        let track_name = document
            .track(session.active_track())
            .map(|t| t.name.clone())
            .unwrap_or_else(|| session.active_track().to_string());
        Self {
            bpm: document.bpm(),
            playhead: transport.playhead(),
            is_playing: transport.is_playing(),
            tool: session.tool().label(),
            snap: snap_label(session.snap()),
            track_name,
            note_count: document.notes().len(),
            selected: session.selection().len(),
            can_undo: session.history().can_undo(),
            can_redo: session.history().can_redo(),
            remote: session.remote_status(),
        }
    }

    /// Format the playhead as "bar.beat", both 1-based.
    pub fn position_display(&self) -> String {
        let beat = self.playhead.max(0.0);
        let bar = (beat / BEATS_PER_BAR).floor() as u64;
        let within = (beat % BEATS_PER_BAR).floor() as u64;
        format!("{}.{}", bar + 1, within + 1)
    }

    /// Format the playback indicator.
    pub fn playback_display(&self) -> &str {
        if self.is_playing {
            "PLAY"
        } else {
            "STOP"
        }
    }

    pub fn remote_display(&self) -> Option<&str> {
        match self.remote {
            RemoteStatus::Idle => None,
            RemoteStatus::Generating => Some("generating…"),
            RemoteStatus::Exporting => Some("exporting…"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> StatusInfo {
        StatusInfo::capture(&Session::default(), &Transport::default())
    }

    #[test]
    fn capture_defaults() {
        let s = status();
        assert_eq!(s.bpm, 120.0);
        assert_eq!(s.tool, "DRAW");
        assert_eq!(s.snap, "1/16");
        assert_eq!(s.track_name, "Piano");
        assert_eq!(s.note_count, 0);
        assert!(!s.can_undo);
        assert!(s.remote_display().is_none());
    }

    #[test]
    fn position_display_format() {
        let s = StatusInfo {
            playhead: 13.5,
            ..status()
        };
        assert_eq!(s.position_display(), "4.2");
        let s = StatusInfo {
            playhead: 0.0,
            ..status()
        };
        assert_eq!(s.position_display(), "1.1");
    }

    #[test]
    fn playback_display() {
        let s = StatusInfo {
            is_playing: true,
            ..status()
        };
        assert_eq!(s.playback_display(), "PLAY");
        assert_eq!(status().playback_display(), "STOP");
    }
}
