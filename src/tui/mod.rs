//! TUI interface — ratatui piano roll with a ruler, velocity lane, track list,
//! and status bar.
//!
//! The App struct holds all TUI state and drives the event loop. It redraws
//! only when input arrived or the playhead moved.

pub mod keybindings;
pub mod message_log;
pub mod roll;
pub mod status;
pub mod theme;

pub use keybindings::{map_key, Action};
pub use message_log::{MessageLog, Severity};
pub use roll::{Overlay, RollCell, Viewport};
pub use status::StatusInfo;
pub use theme::Theme;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::audio::SoundBackend;
use crate::config::AppConfig;
use crate::editor::{GestureEditor, GestureOutcome, Pointer, VelocityEditor, VelocityLane};
use crate::geometry::{snap, snap_label, GridGeometry};
use crate::playback::Transport;
use crate::session::Session;

/// Width of the piano-key gutter.
const GUTTER_WIDTH: u16 = 5;
/// Width of the track list.
const TRACKS_WIDTH: u16 = 26;
/// Rows in the velocity lane.
const LANE_ROWS: u16 = 5;
/// Pitch centred in the view at start-up.
const INITIAL_CENTER: u8 = 60;

/// Screen regions, recomputed whenever the terminal size changes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenLayout {
    pub ruler: Rect,
    pub gutter: Rect,
    pub grid: Rect,
    pub tracks: Rect,
    pub lane: Rect,
    pub status: Rect,
    pub messages: Rect,
}

impl ScreenLayout {
    pub fn compute(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),         // Ruler
                Constraint::Min(4),            // Roll
                Constraint::Length(LANE_ROWS), // Velocity lane
                Constraint::Length(1),         // Status bar
                Constraint::Length(1),         // Messages
            ])
            .split(area);

        let columns = |r: Rect| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(GUTTER_WIDTH),
                    Constraint::Min(8),
                    Constraint::Length(TRACKS_WIDTH),
                ])
                .split(r)
        };
        let ruler = columns(rows[0]);
        let main = columns(rows[1]);
        let lane = columns(rows[2]);

        Self {
            ruler: ruler[1],
            gutter: main[0],
            grid: main[1],
            tracks: main[2],
            lane: lane[1],
            status: rows[3],
            messages: rows[4],
        }
    }
}

fn contains(r: Rect, col: u16, row: u16) -> bool {
    col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height
}

/// Which surface a mouse drag started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    Grid,
    Lane,
}

/// The main TUI application state.
pub struct App {
    pub session: Session,
    pub transport: Transport,
    pub gestures: GestureEditor,
    pub velocity: VelocityEditor,
    pub messages: MessageLog,
    pub theme: Theme,
    pub should_quit: bool,
    backend: Box<dyn SoundBackend>,
    path: Option<PathBuf>,
    scroll_beat: f64,
    layout: ScreenLayout,
    drag: Option<DragTarget>,
    dirty: bool,
}

impl App {
    pub fn new(
        session: Session,
        backend: Box<dyn SoundBackend>,
        config: &AppConfig,
        path: Option<PathBuf>,
    ) -> Self {
        let scheduler = config.scheduler_config().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid playback timing, using defaults");
            Default::default()
        });
        let mut geometry = GridGeometry::new(config.grid.beat_width, config.grid.row_height, 0, 0);
        geometry.center_on(INITIAL_CENTER, 24);

        let mut messages = MessageLog::default();
        if !backend.is_ready() {
            messages.error("audio unavailable: editing only");
        }

        Self {
            session,
            transport: Transport::new(scheduler),
            gestures: GestureEditor::new(geometry, config.grid.edge_margin),
            velocity: VelocityEditor::new(VelocityLane::new(LANE_ROWS as f64, 0.0)),
            messages,
            theme: Theme::default(),
            should_quit: false,
            backend,
            path,
            scroll_beat: 0.0,
            layout: ScreenLayout::default(),
            drag: None,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn scroll_beat(&self) -> f64 {
        self.scroll_beat
    }

    /// Recompute regions for a new terminal size and fit the pitch window to
    /// the roll's height.
    pub fn resize(&mut self, area: Rect) {
        let layout = ScreenLayout::compute(area);
        if layout == self.layout {
            return;
        }
        self.layout = layout;
        let g = self.gestures.geometry();
        let center = ((g.low_pitch as u16 + g.high_pitch as u16) / 2) as u8;
        let rows = (layout.grid.height as f64 / g.row_height).floor().max(1.0) as usize;
        self.gestures.geometry_mut().center_on(center, rows);
        self.velocity.lane_mut().height = layout.lane.height as f64;
        self.dirty = true;
    }

    fn viewport(&self, area: Rect) -> Viewport {
        Viewport {
            scroll_x: self.gestures.geometry().beat_to_x(self.scroll_beat),
            cols: area.width,
            rows: area.height,
        }
    }

    /// Grid pixel under a screen cell, relative to `area`. Off-area positions
    /// extrapolate so drags can leave the roll.
    fn pixel_at(&self, area: Rect, col: u16, row: u16) -> (f64, f64) {
        let scroll_x = self.gestures.geometry().beat_to_x(self.scroll_beat);
        (
            scroll_x + (col as f64 - area.x as f64) + 0.5,
            (row as f64 - area.y as f64) + 0.5,
        )
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Process an action.
    pub fn handle_action(&mut self, action: Action) {
        self.dirty = true;
        // Structural edits would clobber the in-flight gesture's notes.
        if self.drag.is_some()
            && matches!(
                action,
                Action::Undo | Action::Redo | Action::DeleteSelected | Action::Paste
            )
        {
            return;
        }
        match action {
            Action::Quit => self.should_quit = true,
            Action::TogglePlayback => {
                if self.transport.is_playing() {
                    self.transport.stop();
                } else {
                    self.transport
                        .play(&self.session, self.backend.as_mut(), None);
                }
            }
            Action::Rewind => self.transport.rewind(),
            Action::ScrollBeats(delta) => {
                self.scroll_beat = (self.scroll_beat + delta).max(0.0);
            }
            Action::ScrollPitch(delta) => self.gestures.geometry_mut().scroll_pitch(delta),
            Action::Undo => {
                if !self.session.undo() {
                    self.messages.info("nothing to undo");
                }
            }
            Action::Redo => {
                if !self.session.redo() {
                    self.messages.info("nothing to redo");
                }
            }
            Action::DeleteSelected => {
                let n = self.session.delete_selected();
                if n > 0 {
                    self.messages.info(format!("deleted {n} note(s)"));
                }
            }
            Action::Copy => {
                let n = self.session.copy_selected();
                self.messages.info(format!("copied {n} note(s)"));
            }
            Action::Paste => {
                let at = snap(self.transport.playhead(), self.session.snap());
                let n = self.session.paste_at(at);
                if n > 0 {
                    self.messages.info(format!("pasted {n} note(s) at beat {at}"));
                }
            }
            Action::NextTrack => self.session.cycle_active_track(),
            Action::ToggleMute => {
                let id = self.session.active_track().clone();
                if let Some(muted) = self.session.toggle_mute(&id) {
                    let state = if muted { "muted" } else { "unmuted" };
                    self.messages.info(format!("{id} {state}"));
                }
            }
            Action::ToggleHidden => {
                let id = self.session.active_track().clone();
                if let Some(hidden) = self.session.toggle_hidden(&id) {
                    let state = if hidden { "hidden" } else { "shown" };
                    self.messages.info(format!("{id} {state}"));
                }
            }
            Action::SetTool(tool) => self.session.set_tool(tool),
            Action::SetSnap(q) => {
                self.session.set_snap(q);
                self.messages.info(format!("snap {}", snap_label(q)));
            }
            Action::AdjustTempo(delta) => {
                let bpm = self.session.document().bpm() + delta;
                self.session.set_bpm(bpm);
            }
            Action::Write => self.write_document(),
            Action::Cancel => {
                self.gestures.cancel();
                self.velocity.cancel(&mut self.session);
                self.drag = None;
            }
        }
    }

    fn write_document(&mut self) {
        let Some(path) = self.path.clone() else {
            self.messages.error("no file to write: start with `pianoroll edit FILE`");
            return;
        };
        let result = self
            .session
            .export_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "wrote document");
                self.messages.info(format!("wrote {}", path.display()));
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "write failed");
                self.messages.error(format!("write failed: {e}"));
            }
        }
    }

    // ------------------------------------------------------------------
    // Mouse
    // ------------------------------------------------------------------

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (col, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(button) => self.mouse_down(button, col, row),
            MouseEventKind::Drag(_) => self.mouse_drag(col, row),
            MouseEventKind::Up(_) => self.mouse_up(),
            MouseEventKind::ScrollUp if mouse.modifiers.contains(KeyModifiers::SHIFT) => {
                self.handle_action(Action::ScrollBeats(-1.0));
            }
            MouseEventKind::ScrollDown if mouse.modifiers.contains(KeyModifiers::SHIFT) => {
                self.handle_action(Action::ScrollBeats(1.0));
            }
            MouseEventKind::ScrollUp => self.handle_action(Action::ScrollPitch(1)),
            MouseEventKind::ScrollDown => self.handle_action(Action::ScrollPitch(-1)),
            _ => {}
        }
    }

    fn mouse_down(&mut self, button: MouseButton, col: u16, row: u16) {
        let layout = self.layout;

        if contains(layout.grid, col, row) {
            let (x, y) = self.pixel_at(layout.grid, col, row);
            let pointer = match button {
                MouseButton::Right => Pointer::secondary(x, y),
                _ => Pointer::primary(x, y),
            };
            let outcome =
                self.gestures
                    .pointer_down(&mut self.session, pointer, self.backend.as_mut());
            match outcome {
                GestureOutcome::Started => self.drag = Some(DragTarget::Grid),
                GestureOutcome::Deleted(id) => self.messages.info(format!("deleted {id}")),
                _ => {}
            }
        } else if contains(layout.lane, col, row) && button == MouseButton::Left {
            let (x, _) = self.pixel_at(layout.lane, col, row);
            let beat = self.gestures.geometry().x_to_beat(x);
            let y = (row - layout.lane.y) as f64 + 0.5;
            if self.velocity.pointer_down(&mut self.session, beat, y) {
                self.drag = Some(DragTarget::Lane);
            }
        } else if contains(layout.ruler, col, row) {
            let (x, _) = self.pixel_at(layout.ruler, col, row);
            let beat = snap(self.gestures.geometry().x_to_beat(x), self.session.snap());
            self.transport
                .seek(beat, &self.session, self.backend.as_mut());
        } else if contains(layout.tracks, col, row) {
            // One row per track below the border.
            let index = row.saturating_sub(layout.tracks.y + 1) as usize;
            if let Some(id) = self.session.document().tracks().get(index).map(|t| t.id.clone()) {
                self.session.set_active_track(&id);
            }
        }
        self.dirty = true;
    }

    fn mouse_drag(&mut self, col: u16, row: u16) {
        match self.drag {
            Some(DragTarget::Grid) => {
                let (x, y) = self.pixel_at(self.layout.grid, col, row);
                self.gestures.pointer_move(&self.session, x, y);
            }
            Some(DragTarget::Lane) => {
                if contains(self.layout.lane, col, row) {
                    let y = (row - self.layout.lane.y) as f64 + 0.5;
                    self.velocity.pointer_move(&mut self.session, y);
                } else {
                    // Leaving the lane ends the edit.
                    self.velocity.pointer_up(&mut self.session);
                    self.drag = None;
                }
            }
            None => return,
        }
        self.dirty = true;
    }

    fn mouse_up(&mut self) {
        match self.drag.take() {
            Some(DragTarget::Grid) => {
                if let GestureOutcome::Selected(n) = self.gestures.pointer_up(&mut self.session) {
                    self.messages.info(format!("selected {n} note(s)"));
                }
            }
            Some(DragTarget::Lane) => {
                self.velocity.pointer_up(&mut self.session);
            }
            None => return,
        }
        self.dirty = true;
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    pub fn draw(&mut self, frame: &mut Frame) {
        self.resize(frame.area());
        let layout = self.layout;

        let overlay = Overlay {
            ghosts: self.gestures.ghosts(&self.session),
            replaced: self.gestures.ghost_ids(),
            marquee: self.gestures.marquee_rect(),
            playhead: Some(self.transport.playhead()),
        };

        self.draw_ruler(frame, layout.ruler);
        self.draw_roll(frame, layout.gutter, layout.grid, &overlay);
        self.draw_tracks(frame, layout.tracks);
        self.draw_lane(frame, layout.lane, &overlay);
        self.draw_status(frame, layout.status);
        self.draw_messages(frame, layout.messages);
    }

    fn draw_ruler(&self, frame: &mut Frame, area: Rect) {
        let view = self.viewport(area);
        let geometry = self.gestures.geometry();
        let mut text: Vec<char> = vec![' '; area.width as usize];
        for (c, bar) in roll::ruler_labels(geometry, view) {
            for (i, ch) in bar.to_string().chars().enumerate() {
                if let Some(slot) = text.get_mut(c as usize + i) {
                    *slot = ch;
                }
            }
        }
        let playhead_col = geometry.beat_to_x(self.transport.playhead()) - view.scroll_x;
        if playhead_col >= 0.0 {
            if let Some(slot) = text.get_mut(playhead_col as usize) {
                *slot = '▼';
            }
        }
        let line = Line::from(Span::styled(
            text.into_iter().collect::<String>(),
            Style::default().fg(self.theme.ruler),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_roll(&self, frame: &mut Frame, gutter: Rect, grid: Rect, overlay: &Overlay) {
        let geometry = self.gestures.geometry();
        let cells = roll::project_roll(&self.session, geometry, self.viewport(grid), overlay);
        frame.render_widget(Paragraph::new(roll::roll_lines(&cells, &self.theme)), grid);
        frame.render_widget(
            Paragraph::new(roll::gutter_lines(
                geometry,
                gutter.height,
                gutter.width,
                &self.theme,
            )),
            gutter,
        );
    }

    fn draw_tracks(&self, frame: &mut Frame, area: Rect) {
        let document = self.session.document();
        let items: Vec<ListItem> = document
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let active = &track.id == self.session.active_track();
                let hidden = self.session.is_hidden(&track.id);
                let marker = if active { "▸" } else { " " };
                let flags = format!(
                    "{}{}",
                    if track.muted { "M" } else { " " },
                    if hidden { "H" } else { " " }
                );
                let style = if track.muted || hidden {
                    Style::default().fg(self.theme.track_muted)
                } else if active {
                    Style::default()
                        .fg(self.theme.track_active)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.track_color(i))
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{marker} ")),
                    Span::styled(format!("{:<12}", track.name), style),
                    Span::raw(format!("{:>4} {flags}", document.note_count(&track.id))),
                ]))
            })
            .collect();

        let block = Block::default()
            .title(" Tracks ")
            .title_style(Style::default().fg(self.theme.title))
            .borders(Borders::LEFT | Borders::TOP)
            .border_style(Style::default().fg(self.theme.border));
        frame.render_widget(List::new(items).block(block), area);
    }

    fn draw_lane(&self, frame: &mut Frame, area: Rect, overlay: &Overlay) {
        let stems = roll::project_lane(
            &self.session,
            self.gestures.geometry(),
            self.viewport(area),
            overlay,
        );
        let lines = roll::lane_lines(&stems, self.velocity.lane(), area.height, &self.theme);
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let status = StatusInfo::capture(&self.session, &self.transport);
        let accent = Style::default()
            .fg(self.theme.status_accent)
            .bg(self.theme.status_bg)
            .add_modifier(Modifier::BOLD);
        let plain = Style::default()
            .fg(self.theme.status_fg)
            .bg(self.theme.status_bg);

        let mut spans = vec![
            Span::styled(format!(" {} ", status.playback_display()), accent),
            Span::styled(
                format!(
                    " {} | {:.0} BPM | {} | snap {} | {} | {} notes, {} selected ",
                    status.position_display(),
                    status.bpm,
                    status.tool,
                    status.snap,
                    status.track_name,
                    status.note_count,
                    status.selected,
                ),
                plain,
            ),
        ];
        if let Some(remote) = status.remote_display() {
            spans.push(Span::styled(format!(" {remote} "), accent));
        }
        let line = Line::from(spans);
        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(self.theme.status_bg)),
            area,
        );
    }

    fn draw_messages(&self, frame: &mut Frame, area: Rect) {
        let line = match self.messages.latest() {
            Some(m) if !m.is_stale(Duration::from_secs(8)) => {
                let color = match m.severity {
                    Severity::Info => self.theme.status_fg,
                    Severity::Error => self.theme.error,
                };
                Line::from(Span::styled(m.text.clone(), Style::default().fg(color)))
            }
            _ => Line::from(Span::styled(
                "space play · d/s/e tool · 1-7 snap · u/r undo/redo · w write · q quit",
                Style::default().fg(self.theme.track_muted),
            )),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    /// Advance playback. Returns true when the screen needs a redraw.
    pub fn tick(&mut self) -> bool {
        let before = (self.transport.playhead(), self.transport.is_playing());
        self.transport.poll(self.backend.as_mut());
        let after = (self.transport.playhead(), self.transport.is_playing());
        before != after
    }

    /// Run the TUI event loop.
    pub fn run(
        &mut self,
        terminal: &mut ratatui::Terminal<impl ratatui::backend::Backend>,
    ) -> io::Result<()> {
        while !self.should_quit {
            if self.dirty {
                terminal
                    .draw(|frame| self.draw(frame))
                    .map_err(|e| io::Error::other(e.to_string()))?;
                self.dirty = false;
            }

            // Poll for input with a short timeout (5ms for responsive audio)
            if event::poll(Duration::from_millis(5))? {
                match event::read()? {
                    CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = map_key(key) {
                            self.handle_action(action);
                        }
                    }
                    CrosstermEvent::Mouse(mouse) => self.handle_mouse(mouse),
                    CrosstermEvent::Resize(..) => self.dirty = true,
                    _ => {}
                }
            }

            if self.tick() {
                self.dirty = true;
            }
        }

        self.transport.stop();
        Ok(())
    }
}

/// Take over the terminal, run `app`, and restore the terminal afterwards.
pub fn run_app(app: &mut App) -> io::Result<()> {
    let mut terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture)?;
    let result = app.run(&mut terminal);
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}
