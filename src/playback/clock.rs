//! Beat clock — maps the backend's audio clock onto musical time.

/// Anchor pairing an audio time with the beat playing at that instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatClock {
    audio_origin: f64,
    beat_origin: f64,
    seconds_per_beat: f64,
}

impl BeatClock {
    /// Anchor `beat_origin` at `audio_origin` seconds, at `bpm`.
    pub fn new(audio_origin: f64, beat_origin: f64, bpm: f64) -> Self {
        Self {
            audio_origin,
            beat_origin,
            seconds_per_beat: 60.0 / bpm,
        }
    }

    /// Beat position at `audio_now`.
    pub fn beat_at(&self, audio_now: f64) -> f64 {
        self.beat_origin + (audio_now - self.audio_origin) / self.seconds_per_beat
    }

    /// Audio time at which `beat` plays.
    pub fn time_of(&self, beat: f64) -> f64 {
        self.audio_origin + (beat - self.beat_origin) * self.seconds_per_beat
    }

    pub fn audio_origin(&self) -> f64 {
        self.audio_origin
    }

    pub fn beat_origin(&self) -> f64 {
        self.beat_origin
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn beat_advances_with_audio_time() {
        let clock = BeatClock::new(10.0, 0.0, 120.0);
        assert_approx_eq!(clock.beat_at(10.0), 0.0);
        assert_approx_eq!(clock.beat_at(10.5), 1.0);
        assert_approx_eq!(clock.beat_at(12.0), 4.0);
    }

    #[test]
    fn anchored_mid_piece() {
        let clock = BeatClock::new(3.0, 8.0, 60.0);
        assert_approx_eq!(clock.beat_at(4.5), 9.5);
        assert_approx_eq!(clock.time_of(8.0), 3.0);
        assert_approx_eq!(clock.time_of(6.0), 1.0);
    }

    #[test]
    fn time_and_beat_are_inverse() {
        let clock = BeatClock::new(1.25, 2.0, 133.0);
        for beat in [0.0, 2.0, 3.75, 17.5] {
            assert_approx_eq!(clock.beat_at(clock.time_of(beat)), beat);
        }
    }
}
