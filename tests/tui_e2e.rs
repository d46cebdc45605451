//! TUI end-to-end tests — keys flow through the keymap into the App, which
//! edits the session, drives the transport, and reports status.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::layout::Rect;

use pianoroll::audio::SilentBackend;
use pianoroll::config::AppConfig;
use pianoroll::document::{NoteEvent, TrackId};
use pianoroll::session::{Session, Tool};
use pianoroll::tui::keybindings::map_key;
use pianoroll::tui::{App, StatusInfo};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn ctrl_key(c: char) -> KeyEvent {
    KeyEvent {
        code: KeyCode::Char(c),
        modifiers: KeyModifiers::CONTROL,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn app_with_notes(notes: &[(i64, f64)]) -> App {
    let mut session = Session::default();
    let doc = session.document_mut();
    let notes: Vec<NoteEvent> = notes
        .iter()
        .map(|&(p, s)| NoteEvent::new(doc.alloc_id(), p, s, 1.0, 90, TrackId::new("t_piano")))
        .collect();
    if !notes.is_empty() {
        session.commit_notes(notes);
    }
    let mut app = App::new(
        session,
        Box::new(SilentBackend::new()),
        &AppConfig::default(),
        None,
    );
    app.resize(Rect::new(0, 0, 120, 40));
    app
}

fn press(app: &mut App, event: KeyEvent) {
    if let Some(action) = map_key(event) {
        app.handle_action(action);
    }
}

// ============================================================================
// Editing keys
// ============================================================================

#[test]
fn select_all_then_delete_undo_redo() {
    let mut app = app_with_notes(&[(60, 0.0), (62, 1.0)]);
    let ids: Vec<_> = app.session.document().notes().iter().map(|n| n.id).collect();
    app.session.selection_mut().set(ids);

    press(&mut app, key(KeyCode::Delete));
    assert!(app.session.document().notes().is_empty());

    press(&mut app, key(KeyCode::Char('u')));
    assert_eq!(app.session.document().notes().len(), 2);

    press(&mut app, ctrl_key('y'));
    assert!(app.session.document().notes().is_empty());

    press(&mut app, ctrl_key('z'));
    assert_eq!(app.session.document().notes().len(), 2);
}

#[test]
fn copy_paste_at_playhead() {
    let mut app = app_with_notes(&[(60, 0.0), (64, 0.5)]);
    let ids: Vec<_> = app.session.document().notes().iter().map(|n| n.id).collect();
    app.session.selection_mut().set(ids);

    press(&mut app, key(KeyCode::Char('c')));
    // Playhead at zero: the copy lands on the originals' beats.
    press(&mut app, key(KeyCode::Char('v')));

    let notes = app.session.document().notes();
    assert_eq!(notes.len(), 4);
    assert_eq!(notes[2].start, 0.0);
    assert_eq!(notes[3].start, 0.5);
    assert_ne!(notes[2].id, notes[0].id);
}

#[test]
fn tool_and_snap_keys_show_in_status() {
    let mut app = app_with_notes(&[]);
    press(&mut app, key(KeyCode::Char('e')));
    press(&mut app, key(KeyCode::Char('4')));

    let status = StatusInfo::capture(&app.session, &app.transport);
    assert_eq!(app.session.tool(), Tool::Erase);
    assert_eq!(status.tool, "ERASE");
    assert_eq!(status.snap, "1/8");
}

#[test]
fn track_keys_cycle_mute_and_hide() {
    let mut app = app_with_notes(&[]);
    press(&mut app, key(KeyCode::Tab));
    assert_eq!(app.session.active_track(), &TrackId::new("t_bass"));

    press(&mut app, key(KeyCode::Char('m')));
    let bass = app.session.document().track(&TrackId::new("t_bass")).unwrap();
    assert!(bass.muted);

    press(&mut app, key(KeyCode::Char('h')));
    assert!(app.session.is_hidden(&TrackId::new("t_bass")));
}

// ============================================================================
// Transport keys
// ============================================================================

#[test]
fn space_toggles_playback_and_home_rewinds() {
    let mut app = app_with_notes(&[(60, 0.0)]);
    press(&mut app, key(KeyCode::Char(' ')));
    assert!(app.transport.is_playing());

    press(&mut app, key(KeyCode::Home));
    assert!(!app.transport.is_playing());
    assert_eq!(app.transport.playhead(), 0.0);
}

#[test]
fn tempo_keys_adjust_and_clamp() {
    let mut app = app_with_notes(&[]);
    press(&mut app, key(KeyCode::Char('+')));
    assert_eq!(app.session.document().bpm(), 125.0);
    for _ in 0..100 {
        press(&mut app, key(KeyCode::Char('-')));
    }
    assert_eq!(app.session.document().bpm(), 40.0);
}

#[test]
fn pitch_scroll_moves_window() {
    let mut app = app_with_notes(&[]);
    let before = *app.gestures.geometry();
    press(&mut app, key(KeyCode::PageUp));
    let after = *app.gestures.geometry();
    assert_eq!(after.high_pitch, before.high_pitch + 12);
    assert_eq!(after.rows(), before.rows());
}

#[test]
fn quit_keys() {
    let mut app = app_with_notes(&[]);
    press(&mut app, key(KeyCode::Char('q')));
    assert!(app.should_quit);

    let mut app = app_with_notes(&[]);
    press(&mut app, ctrl_key('c'));
    assert!(app.should_quit);
}
