//! Pianoroll — a terminal piano roll for sketching and auditioning short pieces.

pub mod audio;
pub mod config;
pub mod document;
pub mod editor;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod playback;
pub mod remote;
pub mod session;
pub mod tui;
