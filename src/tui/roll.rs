//! Piano roll projection — maps the document onto terminal cells.
//!
//! Projection is pure: it produces a grid of [`RollCell`]s from the session,
//! the gesture overlay and a viewport, and the App turns cells into styled
//! spans. Everything goes through [`GridGeometry`], the same mapping the
//! editors use for hit testing.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::theme::Theme;
use crate::document::{is_black_key, note_name, NoteEvent, NoteId, BEATS_PER_BAR};
use crate::editor::VelocityLane;
use crate::geometry::GridGeometry;
use crate::session::Session;

/// Vertical rule drawn on an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLine {
    None,
    Beat,
    Bar,
}

/// A cell of the projected roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RollCell {
    Empty { black_key: bool, line: GridLine },
    /// A committed note; `track` indexes the document's track list.
    Note { track: usize, selected: bool },
    /// A provisional note from the active gesture.
    Ghost,
    Playhead,
    Marquee,
}

/// The visible window, in cells. `scroll_x` is the horizontal offset in grid
/// pixels (beats × beat width).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub cols: u16,
    pub rows: u16,
}

impl Viewport {
    /// Grid pixel at the centre of a cell.
    pub fn cell_center(&self, col: u16, row: u16) -> (f64, f64) {
        (self.scroll_x + col as f64 + 0.5, row as f64 + 0.5)
    }

    fn col_of(&self, x: f64) -> i64 {
        (x - self.scroll_x).floor() as i64
    }
}

/// What the active gesture contributes on top of the document.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    pub ghosts: Vec<NoteEvent>,
    /// Committed notes hidden while their ghosts are shown.
    pub replaced: Vec<NoteId>,
    pub marquee: Option<(f64, f64, f64, f64)>,
    pub playhead: Option<f64>,
}

/// Project visible notes into a `rows × cols` grid.
pub fn project_roll(
    session: &Session,
    geometry: &GridGeometry,
    view: Viewport,
    overlay: &Overlay,
) -> Vec<Vec<RollCell>> {
    let cols = view.cols as usize;
    let rows = view.rows as usize;

    let mut cells: Vec<Vec<RollCell>> = (0..rows)
        .map(|r| {
            let (_, y) = view.cell_center(0, r as u16);
            let pitch = geometry.y_to_pitch(y);
            let black_key = (0..=127).contains(&pitch) && is_black_key(pitch as u8);
            (0..cols)
                .map(|c| RollCell::Empty {
                    black_key,
                    line: grid_line(geometry, view, c as u16),
                })
                .collect()
        })
        .collect();

    let tracks = session.document().tracks();
    let track_index = |n: &NoteEvent| tracks.iter().position(|t| t.id == n.track).unwrap_or(0);

    for note in session.visible_notes() {
        if overlay.replaced.contains(&note.id) {
            continue;
        }
        let cell = RollCell::Note {
            track: track_index(note),
            selected: session.selection().contains(note.id),
        };
        paint_note(&mut cells, geometry, view, note, cell);
    }
    for ghost in &overlay.ghosts {
        paint_note(&mut cells, geometry, view, ghost, RollCell::Ghost);
    }

    if let Some((x0, y0, x1, y1)) = overlay.marquee {
        let (c0, c1) = (view.col_of(x0), view.col_of(x1));
        let (r0, r1) = (y0.floor() as i64, y1.floor() as i64);
        for r in r0..=r1 {
            for c in c0..=c1 {
                if r == r0 || r == r1 || c == c0 || c == c1 {
                    if let Some(cell) = cell_at(&mut cells, r, c) {
                        if matches!(cell, RollCell::Empty { .. }) {
                            *cell = RollCell::Marquee;
                        }
                    }
                }
            }
        }
    }

    if let Some(beat) = overlay.playhead {
        let c = view.col_of(geometry.beat_to_x(beat));
        for r in 0..rows as i64 {
            if let Some(cell) = cell_at(&mut cells, r, c) {
                if matches!(cell, RollCell::Empty { .. }) {
                    *cell = RollCell::Playhead;
                }
            }
        }
    }

    cells
}

fn cell_at(cells: &mut [Vec<RollCell>], row: i64, col: i64) -> Option<&mut RollCell> {
    if row < 0 || col < 0 {
        return None;
    }
    cells.get_mut(row as usize)?.get_mut(col as usize)
}

fn paint_note(
    cells: &mut [Vec<RollCell>],
    geometry: &GridGeometry,
    view: Viewport,
    note: &NoteEvent,
    cell: RollCell,
) {
    let x0 = geometry.beat_to_x(note.start) - view.scroll_x;
    let x1 = geometry.beat_to_x(note.end()) - view.scroll_x;
    let y0 = geometry.pitch_to_y(note.pitch);
    let y1 = y0 + geometry.row_height;

    let c0 = x0.floor() as i64;
    // Every note covers at least one cell.
    let c1 = (x1.ceil() as i64).max(c0 + 1);
    let r0 = y0.floor() as i64;
    let r1 = (y1.ceil() as i64).max(r0 + 1);

    for r in r0..r1 {
        for c in c0..c1 {
            if let Some(slot) = cell_at(cells, r, c) {
                *slot = cell;
            }
        }
    }
}

fn grid_line(geometry: &GridGeometry, view: Viewport, col: u16) -> GridLine {
    let left = view.scroll_x + col as f64;
    let beat = geometry.x_to_beat(left).ceil();
    // Does a beat boundary fall inside this column?
    if geometry.beat_to_x(beat) >= left + 1.0 {
        return GridLine::None;
    }
    if beat.rem_euclid(BEATS_PER_BAR) == 0.0 {
        GridLine::Bar
    } else {
        GridLine::Beat
    }
}

/// Bar numbers (1-based) and the columns where they start.
pub fn ruler_labels(geometry: &GridGeometry, view: Viewport) -> Vec<(u16, u32)> {
    (0..view.cols)
        .filter_map(|c| match grid_line(geometry, view, c) {
            GridLine::Bar => {
                let beat = geometry.x_to_beat(view.scroll_x + c as f64).ceil();
                Some((c, (beat / BEATS_PER_BAR) as u32 + 1))
            }
            _ => None,
        })
        .collect()
}

/// One velocity stem per column: the note centred there (last wins).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stem {
    pub velocity: u8,
    pub track: usize,
    pub selected: bool,
}

pub fn project_lane(
    session: &Session,
    geometry: &GridGeometry,
    view: Viewport,
    overlay: &Overlay,
) -> Vec<Option<Stem>> {
    let mut stems = vec![None; view.cols as usize];
    let tracks = session.document().tracks();
    for note in session.visible_notes() {
        if overlay.replaced.contains(&note.id) {
            continue;
        }
        let c = view.col_of(geometry.beat_to_x(note.center()));
        if c < 0 {
            continue;
        }
        if let Some(slot) = stems.get_mut(c as usize) {
            *slot = Some(Stem {
                velocity: note.velocity,
                track: tracks.iter().position(|t| t.id == note.track).unwrap_or(0),
                selected: session.selection().contains(note.id),
            });
        }
    }
    stems
}

// ----------------------------------------------------------------------
// Styling
// ----------------------------------------------------------------------

/// Styled lines for the roll.
pub fn roll_lines(cells: &[Vec<RollCell>], theme: &Theme) -> Vec<Line<'static>> {
    cells
        .iter()
        .map(|row| {
            let spans: Vec<Span> = row.iter().map(|cell| roll_span(*cell, theme)).collect();
            Line::from(spans)
        })
        .collect()
}

fn roll_span(cell: RollCell, theme: &Theme) -> Span<'static> {
    match cell {
        RollCell::Empty { black_key, line } => {
            let bg = if black_key {
                theme.row_black
            } else {
                theme.row_white
            };
            let (ch, fg) = match line {
                GridLine::None => (" ", theme.beat_line),
                GridLine::Beat => ("┊", theme.beat_line),
                GridLine::Bar => ("│", theme.bar_line),
            };
            Span::styled(ch, Style::default().fg(fg).bg(bg))
        }
        RollCell::Note { track, selected } => {
            let color = theme.track_color(track);
            if selected {
                Span::styled(
                    "█",
                    Style::default()
                        .fg(theme.note_selected)
                        .bg(color)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled("█", Style::default().fg(color))
            }
        }
        RollCell::Ghost => Span::styled("▒", Style::default().fg(theme.note_ghost)),
        RollCell::Playhead => Span::styled("│", Style::default().fg(theme.playhead)),
        RollCell::Marquee => Span::styled("·", Style::default().fg(theme.marquee)),
    }
}

/// Piano-key gutter lines, `width` columns wide.
pub fn gutter_lines(
    geometry: &GridGeometry,
    rows: u16,
    width: u16,
    theme: &Theme,
) -> Vec<Line<'static>> {
    (0..rows)
        .map(|r| {
            let pitch = geometry.y_to_pitch(r as f64 + 0.5);
            if !(0..=127).contains(&pitch) {
                return Line::from("");
            }
            let pitch = pitch as u8;
            let style = if is_black_key(pitch) {
                Style::default().fg(theme.key_white).bg(theme.key_black)
            } else {
                Style::default().fg(Color::Black).bg(theme.key_white)
            };
            let label = if pitch % 12 == 0 || (!is_black_key(pitch) && width > 4) {
                note_name(pitch)
            } else {
                String::new()
            };
            Line::from(Span::styled(
                format!("{:<w$}", label, w = width as usize),
                style,
            ))
        })
        .collect()
}

/// Velocity lane lines, drawn bottom-up as stems.
pub fn lane_lines(
    stems: &[Option<Stem>],
    lane: &VelocityLane,
    rows: u16,
    theme: &Theme,
) -> Vec<Line<'static>> {
    (0..rows)
        .map(|r| {
            // Rows counted from the bottom of the lane.
            let level = (rows - r) as f64;
            let spans: Vec<Span> = stems
                .iter()
                .map(|stem| match stem {
                    Some(s) if lane.stem_height(s.velocity).ceil() >= level => {
                        let fg = if s.selected {
                            theme.note_selected
                        } else {
                            theme.track_color(s.track)
                        };
                        let ch = if lane.stem_height(s.velocity).ceil() == level {
                            "▪"
                        } else {
                            "│"
                        };
                        Span::styled(ch, Style::default().fg(fg))
                    }
                    _ => Span::raw(" "),
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}
