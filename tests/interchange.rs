//! Interchange tests — import validation, arrangement flattening, export
//! packing, and file round trips through the session.

use pianoroll::document::{ImportError, MusicData, NoteEvent, TrackId};
use pianoroll::session::Session;

const TWO_SECTIONS: &str = r#"{
  "bpm": 96,
  "tracks": [
    {"id": "t_keys", "instrument": "Electric Piano", "type": "instrument"},
    {"id": "t_drums", "instrument": "Kick", "type": "percussion", "muted": true}
  ],
  "clips": {
    "verse": [
      {"note": 60, "start": 0, "duration": 1, "velocity": 80},
      {"note": 64, "start": 1, "duration": 1}
    ],
    "beat": [
      {"note": 36, "start": 0, "duration": 0.5, "velocity": 120, "track_id": "t_drums"}
    ]
  },
  "arrangement": [
    {"section": "A", "start_bar": 0, "track_id": "t_keys", "clip_id": "verse"},
    {"section": "B", "start_bar": 2, "track_id": "t_keys", "clip_id": "verse"},
    {"section": "A", "start_bar": 0, "track_id": "t_keys", "clip_id": "beat"},
    {"section": "A", "start_bar": 1, "track_id": "t_keys", "clip_id": "missing"}
  ]
}"#;

// ============================================================================
// Import
// ============================================================================

#[test]
fn import_flattens_arrangement() {
    let mut session = Session::default();
    let count = session.import_json(TWO_SECTIONS).unwrap();
    assert_eq!(count, 5);

    let document = session.document();
    assert_eq!(document.bpm(), 96.0);
    assert_eq!(document.tracks().len(), 2);
    assert!(document.tracks()[1].muted);
    assert_eq!(session.active_track(), &TrackId::new("t_keys"));

    let placed: Vec<(u8, f64, &str)> = document
        .notes()
        .iter()
        .map(|n| (n.pitch, n.start, n.track.as_str()))
        .collect();
    assert_eq!(
        placed,
        vec![
            (60, 0.0, "t_keys"),
            (64, 1.0, "t_keys"),
            (60, 8.0, "t_keys"),
            (64, 9.0, "t_keys"),
            (36, 0.0, "t_drums"),
        ]
    );
    // Velocity defaults when absent.
    assert_eq!(document.notes()[1].velocity, 90);
}

#[test]
fn imported_notes_get_unique_ids() {
    let mut session = Session::default();
    session.import_json(TWO_SECTIONS).unwrap();
    let mut ids: Vec<_> = session.document().notes().iter().map(|n| n.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[test]
fn import_is_one_undo_step() {
    let mut session = Session::default();
    session.import_json(TWO_SECTIONS).unwrap();
    assert!(session.undo());
    assert!(session.document().notes().is_empty());
}

#[test]
fn rejected_import_leaves_document_untouched() {
    let mut session = Session::default();
    session.import_json(TWO_SECTIONS).unwrap();
    let before = session.document().notes().to_vec();

    let err = session.import_json(r#"{"bpm": 120, "tracks": []}"#).unwrap_err();
    assert!(matches!(err, ImportError::MissingField("clips")));

    let err = session
        .import_json(r#"{"bpm": 0, "tracks": [], "clips": {}}"#)
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidTempo(_)));

    let err = session.import_json("not json").unwrap_err();
    assert!(matches!(err, ImportError::Json(_)));

    assert_eq!(session.document().notes(), before.as_slice());
    assert_eq!(session.document().bpm(), 96.0);
}

#[test]
fn slow_tempo_survives_import_and_write() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("slow.json");

    let mut session = Session::default();
    session
        .import_json(r#"{"bpm": 30, "tracks": [], "clips": {}, "arrangement": []}"#)
        .unwrap();
    assert_eq!(session.document().bpm(), 30.0);

    std::fs::write(&path, session.export_json().unwrap()).unwrap();
    let written = MusicData::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.bpm, 30.0);
}

#[test]
fn empty_track_list_keeps_current_tracks() {
    let mut session = Session::default();
    session
        .import_json(r#"{"bpm": 140, "tracks": [], "clips": {}, "arrangement": []}"#)
        .unwrap();
    assert_eq!(session.document().tracks().len(), 5);
    assert_eq!(session.document().bpm(), 140.0);
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn export_packs_one_clip_per_track() {
    let mut session = Session::default();
    let doc = session.document_mut();
    let notes = vec![
        NoteEvent::new(doc.alloc_id(), 60, 0.0, 1.0, 100, TrackId::new("t_piano")),
        NoteEvent::new(doc.alloc_id(), 40, 2.0, 1.0, 90, TrackId::new("t_bass")),
        NoteEvent::new(doc.alloc_id(), 64, 4.0, 0.5, 70, TrackId::new("t_piano")),
    ];
    session.commit_notes(notes);

    let data = session.to_music_data();
    assert_eq!(data.clips.len(), 2);
    assert_eq!(data.clips["clip_t_piano"].len(), 2);
    assert_eq!(data.clips["clip_t_bass"].len(), 1);
    assert_eq!(data.arrangement.len(), 2);
    assert!(data.arrangement.iter().all(|a| a.start_bar == 0));
    assert_eq!(data.tracks.len(), 5);
}

#[test]
fn file_round_trip_preserves_notes() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("piece.json");

    let mut original = Session::default();
    original.import_json(TWO_SECTIONS).unwrap();
    std::fs::write(&path, original.export_json().unwrap()).unwrap();

    let mut restored = Session::default();
    let text = std::fs::read_to_string(&path).unwrap();
    restored.import_json(&text).unwrap();

    let key = |s: &Session| {
        let mut v: Vec<(u8, String, String, String, u8)> = s
            .document()
            .notes()
            .iter()
            .map(|n| {
                (
                    n.pitch,
                    format!("{:.3}", n.start),
                    format!("{:.3}", n.duration),
                    n.track.to_string(),
                    n.velocity,
                )
            })
            .collect();
        v.sort();
        v
    };
    assert_eq!(key(&original), key(&restored));
    assert_eq!(restored.document().bpm(), 96.0);
    assert_eq!(restored.document().tracks(), original.document().tracks());
}

#[test]
fn parse_value_matches_parse_text() {
    let value: serde_json::Value = serde_json::from_str(TWO_SECTIONS).unwrap();
    let a = MusicData::from_value(value).unwrap();
    let b = MusicData::from_json(TWO_SECTIONS).unwrap();
    assert_eq!(a, b);
}
