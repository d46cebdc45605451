//! Key bindings — maps key events to application actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::geometry::SNAP_VALUES;
use crate::session::Tool;

/// Tempo change per `+` / `-` press.
pub const TEMPO_STEP: f64 = 5.0;

/// Application-level actions triggered by key events.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Quit the application.
    Quit,
    /// Toggle play/stop.
    TogglePlayback,
    /// Stop and return the playhead to zero.
    Rewind,
    /// Scroll the view horizontally by beats.
    ScrollBeats(f64),
    /// Scroll the view vertically by semitones.
    ScrollPitch(i32),
    Undo,
    Redo,
    DeleteSelected,
    Copy,
    /// Paste at the playhead.
    Paste,
    /// Make the next track active.
    NextTrack,
    /// Mute/unmute the active track.
    ToggleMute,
    /// Hide/show the active track.
    ToggleHidden,
    SetTool(Tool),
    /// Set the snap quantum in beats.
    SetSnap(f64),
    /// Change tempo by a delta.
    AdjustTempo(f64),
    /// Write interchange JSON to the opened path.
    Write,
    /// Abandon the active gesture.
    Cancel,
}

/// Map a key event to an application action.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('z') => Some(Action::Undo),
            KeyCode::Char('y') => Some(Action::Redo),
            KeyCode::Char('s') => Some(Action::Write),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePlayback),
        KeyCode::Home => Some(Action::Rewind),
        KeyCode::Left => Some(Action::ScrollBeats(-1.0)),
        KeyCode::Right => Some(Action::ScrollBeats(1.0)),
        KeyCode::Up => Some(Action::ScrollPitch(1)),
        KeyCode::Down => Some(Action::ScrollPitch(-1)),
        KeyCode::PageUp => Some(Action::ScrollPitch(12)),
        KeyCode::PageDown => Some(Action::ScrollPitch(-12)),
        KeyCode::Char('u') => Some(Action::Undo),
        KeyCode::Char('r') => Some(Action::Redo),
        KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('x') => {
            Some(Action::DeleteSelected)
        }
        KeyCode::Char('c') => Some(Action::Copy),
        KeyCode::Char('v') => Some(Action::Paste),
        KeyCode::Tab => Some(Action::NextTrack),
        KeyCode::Char('m') => Some(Action::ToggleMute),
        KeyCode::Char('h') => Some(Action::ToggleHidden),
        KeyCode::Char('d') => Some(Action::SetTool(Tool::Draw)),
        KeyCode::Char('s') => Some(Action::SetTool(Tool::Select)),
        KeyCode::Char('e') => Some(Action::SetTool(Tool::Erase)),
        KeyCode::Char(c @ '1'..='7') => {
            let idx = c as usize - '1' as usize;
            SNAP_VALUES.get(idx).map(|(_, q)| Action::SetSnap(*q))
        }
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::AdjustTempo(TEMPO_STEP)),
        KeyCode::Char('-') => Some(Action::AdjustTempo(-TEMPO_STEP)),
        KeyCode::Char('w') => Some(Action::Write),
        KeyCode::Esc => Some(Action::Cancel),
        _ => None,
    }
}
