//! Colors for the piano roll.

use ratatui::style::Color;

/// A complete color theme for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // Roll
    pub track_palette: [Color; 8],
    pub note_selected: Color,
    pub note_ghost: Color,
    pub row_white: Color,
    pub row_black: Color,
    pub beat_line: Color,
    pub bar_line: Color,
    pub playhead: Color,
    pub marquee: Color,

    // Gutter & ruler
    pub key_white: Color,
    pub key_black: Color,
    pub ruler: Color,

    // Tracks panel
    pub track_active: Color,
    pub track_muted: Color,

    // Status bar
    pub status_fg: Color,
    pub status_bg: Color,
    pub status_accent: Color,
    pub error: Color,

    // Borders & chrome
    pub border: Color,
    pub title: Color,
}

impl Theme {
    /// Color for the `index`-th track.
    pub fn track_color(&self, index: usize) -> Color {
        self.track_palette[index % self.track_palette.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            track_palette: [
                Color::Cyan,
                Color::Magenta,
                Color::Yellow,
                Color::Green,
                Color::Blue,
                Color::Red,
                Color::LightCyan,
                Color::LightMagenta,
            ],
            note_selected: Color::White,
            note_ghost: Color::Gray,
            row_white: Color::Reset,
            row_black: Color::Rgb(24, 24, 32),
            beat_line: Color::Rgb(48, 48, 56),
            bar_line: Color::DarkGray,
            playhead: Color::Green,
            marquee: Color::Yellow,
            key_white: Color::White,
            key_black: Color::DarkGray,
            ruler: Color::Cyan,
            track_active: Color::Cyan,
            track_muted: Color::DarkGray,
            status_fg: Color::White,
            status_bg: Color::DarkGray,
            status_accent: Color::Cyan,
            error: Color::Red,
            border: Color::White,
            title: Color::Cyan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_colors_wrap() {
        let theme = Theme::default();
        assert_eq!(theme.track_color(0), theme.track_color(8));
        assert_ne!(theme.track_color(0), theme.track_color(1));
    }
}
