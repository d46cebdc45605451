//! Grid geometry — coordinate mapping and snapping shared by every surface.
//!
//! Screen space is measured in "pixels" (terminal cells in the TUI); logical
//! space is beats and MIDI pitches. Editing and rendering both go through
//! [`GridGeometry`] so the two never diverge.

/// Highest MIDI pitch.
pub const MAX_PITCH: u8 = 127;

/// Selectable snap quanta, in beats. `0.0` means free placement.
pub const SNAP_VALUES: [(&str, f64); 7] = [
    ("1/1", 4.0),
    ("1/2", 2.0),
    ("1/4", 1.0),
    ("1/8", 0.5),
    ("1/16", 0.25),
    ("1/32", 0.125),
    ("Off", 0.0),
];

/// Round `value` to the nearest multiple of `quantum`.
///
/// A quantum of zero (or below) leaves the value untouched.
pub fn snap(value: f64, quantum: f64) -> f64 {
    if quantum <= 0.0 {
        return value;
    }
    (value / quantum).round() * quantum
}

/// Label for a snap quantum, e.g. `"1/16"`.
pub fn snap_label(quantum: f64) -> &'static str {
    SNAP_VALUES
        .iter()
        .find(|(_, q)| (q - quantum).abs() < f64::EPSILON)
        .map(|(label, _)| *label)
        .unwrap_or("custom")
}

/// Mapping between grid pixels and (beat, pitch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Pixels per beat.
    pub beat_width: f64,
    /// Pixels per pitch row.
    pub row_height: f64,
    /// Lowest visible pitch (inclusive).
    pub low_pitch: u8,
    /// Highest visible pitch (inclusive), drawn in the top row.
    pub high_pitch: u8,
}

impl GridGeometry {
    pub fn new(beat_width: f64, row_height: f64, low_pitch: u8, high_pitch: u8) -> Self {
        let high_pitch = high_pitch.min(MAX_PITCH);
        Self {
            beat_width,
            row_height,
            low_pitch: low_pitch.min(high_pitch),
            high_pitch,
        }
    }

    pub fn beat_to_x(&self, beat: f64) -> f64 {
        beat * self.beat_width
    }

    pub fn x_to_beat(&self, x: f64) -> f64 {
        x / self.beat_width
    }

    pub fn pitch_to_y(&self, pitch: u8) -> f64 {
        (self.high_pitch as f64 - pitch as f64) * self.row_height
    }

    /// Pitch of the row containing `y`. May fall outside the visible range
    /// (or even below zero) when `y` is off-grid; callers clamp.
    pub fn y_to_pitch(&self, y: f64) -> i32 {
        self.high_pitch as i32 - (y / self.row_height).floor() as i32
    }

    /// Clamp an arbitrary pitch into the visible range.
    pub fn clamp_pitch(&self, pitch: i32) -> u8 {
        pitch.clamp(self.low_pitch as i32, self.high_pitch as i32) as u8
    }

    /// Number of visible pitch rows.
    pub fn rows(&self) -> usize {
        (self.high_pitch - self.low_pitch) as usize + 1
    }

    /// Shift the visible window by `semitones`, keeping its height.
    pub fn scroll_pitch(&mut self, semitones: i32) {
        let span = (self.high_pitch - self.low_pitch) as i32;
        let high = (self.high_pitch as i32 + semitones).clamp(span, MAX_PITCH as i32);
        self.high_pitch = high as u8;
        self.low_pitch = (high - span) as u8;
    }

    /// Centre a window of `rows` pitches around `center`.
    pub fn center_on(&mut self, center: u8, rows: usize) {
        let span = rows.saturating_sub(1).min(MAX_PITCH as usize) as i32;
        let high = (center as i32 + span / 2).clamp(span, MAX_PITCH as i32);
        self.high_pitch = high as u8;
        self.low_pitch = (high - span) as u8;
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::new(40.0, 24.0, 24, 96)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn geo() -> GridGeometry {
        GridGeometry::new(40.0, 24.0, 36, 84)
    }

    #[test]
    fn snap_zero_is_identity() {
        for v in [0.0, 0.13, 2.05, 7.999, 100.5] {
            assert_eq!(snap(v, 0.0), v);
            assert_eq!(snap(v, -1.0), v);
        }
    }

    #[test]
    fn snap_rounds_to_nearest_multiple() {
        assert_approx_eq!(snap(2.05, 0.25), 2.0);
        assert_approx_eq!(snap(2.13, 0.25), 2.25);
        assert_approx_eq!(snap(0.3, 1.0), 0.0);
        assert_approx_eq!(snap(0.6, 1.0), 1.0);
    }

    #[test]
    fn snap_is_idempotent() {
        for &(_, q) in SNAP_VALUES.iter().filter(|(_, q)| *q > 0.0) {
            let mut v = -3.0;
            while v < 17.0 {
                let once = snap(v, q);
                assert_approx_eq!(snap(once, q), once);
                v += 0.037;
            }
        }
    }

    #[test]
    fn x_and_beat_are_inverse() {
        let g = geo();
        assert_approx_eq!(g.beat_to_x(2.5), 100.0);
        assert_approx_eq!(g.x_to_beat(g.beat_to_x(3.75)), 3.75);
    }

    #[test]
    fn top_row_is_high_pitch() {
        let g = geo();
        assert_approx_eq!(g.pitch_to_y(84), 0.0);
        assert_eq!(g.y_to_pitch(0.0), 84);
        assert_eq!(g.y_to_pitch(23.9), 84);
        assert_eq!(g.y_to_pitch(24.0), 83);
    }

    #[test]
    fn pitch_row_round_trip() {
        let g = geo();
        for pitch in 36..=84u8 {
            let y = g.pitch_to_y(pitch) + 1.0;
            assert_eq!(g.y_to_pitch(y), pitch as i32);
        }
    }

    #[test]
    fn clamp_pitch_to_visible_range() {
        let g = geo();
        assert_eq!(g.clamp_pitch(10), 36);
        assert_eq!(g.clamp_pitch(200), 84);
        assert_eq!(g.clamp_pitch(60), 60);
    }

    #[test]
    fn scroll_keeps_span_and_bounds() {
        let mut g = geo();
        g.scroll_pitch(100);
        assert_eq!(g.high_pitch, 127);
        assert_eq!(g.rows(), 49);
        g.scroll_pitch(-500);
        assert_eq!(g.low_pitch, 0);
        assert_eq!(g.rows(), 49);
    }

    #[test]
    fn center_on_pitch() {
        let mut g = geo();
        g.center_on(60, 25);
        assert_eq!(g.high_pitch, 72);
        assert_eq!(g.low_pitch, 48);
    }

    #[test]
    fn snap_labels() {
        assert_eq!(snap_label(0.25), "1/16");
        assert_eq!(snap_label(0.0), "Off");
        assert_eq!(snap_label(0.3), "custom");
    }
}
