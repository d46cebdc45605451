//! Voices — the minimal synth rendered on the audio thread.
//!
//! Each scheduled note becomes a [`Voice`] with an onset frame and, once
//! released, a release frame. Rendering is per frame against the absolute
//! frame counter, so onsets land sample-accurately regardless of buffer size.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::document::{Track, TrackKind};

/// Convert a MIDI note number to frequency in Hz (A4 = 440).
pub fn midi_to_freq(pitch: u8) -> f64 {
    440.0 * 2.0_f64.powf((pitch as f64 - 69.0) / 12.0)
}

/// Attack-decay-sustain-release envelope, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Envelope {
    /// Amplitude `t` seconds after onset for a note held `held` seconds.
    ///
    /// `held` is infinite while the note has not been released.
    pub fn amplitude(&self, t: f64, held: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        let level = if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            let k = (t - self.attack) / self.decay;
            1.0 - k * (1.0 - self.sustain)
        } else {
            self.sustain
        };

        if t < held {
            return level;
        }
        if self.release <= 0.0 {
            return 0.0;
        }
        // Release from whatever level the note had reached at `held`.
        let from = self.amplitude(held, f64::INFINITY);
        let k = (t - held) / self.release;
        (from * (1.0 - k)).max(0.0)
    }

    /// Whether the envelope has gone silent for good.
    pub fn is_finished(&self, t: f64, held: f64) -> bool {
        if self.sustain <= 0.0 && t >= self.attack + self.decay {
            return true;
        }
        t >= held + self.release
    }
}

/// Sound assigned to a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceKind {
    /// Sine with a soft attack.
    Tone,
    /// Sine plus octave, short decay to a lower sustain.
    Bass,
    /// Pitch-swept sine thump.
    Kick,
    /// Filtered white noise; `decay` in seconds.
    Noise { decay: f64 },
}

impl VoiceKind {
    /// Pick a sound from a track's category and name.
    pub fn for_track(track: &Track) -> Self {
        let name = track.name.to_lowercase();
        match track.kind {
            TrackKind::Percussion if name.contains("kick") => VoiceKind::Kick,
            TrackKind::Percussion if name.contains("hat") => VoiceKind::Noise { decay: 0.05 },
            TrackKind::Percussion => VoiceKind::Noise { decay: 0.18 },
            TrackKind::Instrument if name.contains("bass") => VoiceKind::Bass,
            TrackKind::Instrument => VoiceKind::Tone,
        }
    }

    pub fn envelope(self) -> Envelope {
        match self {
            VoiceKind::Tone => Envelope {
                attack: 0.01,
                decay: 0.2,
                sustain: 0.6,
                release: 0.15,
            },
            VoiceKind::Bass => Envelope {
                attack: 0.005,
                decay: 0.1,
                sustain: 0.5,
                release: 0.08,
            },
            VoiceKind::Kick => Envelope {
                attack: 0.002,
                decay: 0.35,
                sustain: 0.0,
                release: 0.0,
            },
            VoiceKind::Noise { decay } => Envelope {
                attack: 0.001,
                decay,
                sustain: 0.0,
                release: 0.0,
            },
        }
    }
}

/// One sounding (or pending) note on the audio thread.
#[derive(Debug, Clone)]
pub struct Voice {
    pub id: u64,
    kind: VoiceKind,
    envelope: Envelope,
    freq: f64,
    gain: f32,
    start_frame: u64,
    release_frame: Option<u64>,
    phase: f64,
    filter: f64,
    rng: ChaCha8Rng,
}

impl Voice {
    pub fn new(id: u64, kind: VoiceKind, pitch: u8, gain: f32, start_frame: u64) -> Self {
        Self {
            id,
            kind,
            envelope: kind.envelope(),
            freq: midi_to_freq(pitch),
            gain,
            start_frame,
            release_frame: None,
            phase: 0.0,
            filter: 0.0,
            rng: ChaCha8Rng::seed_from_u64(id),
        }
    }

    /// Schedule the release. Never earlier than the onset.
    pub fn release_at(&mut self, frame: u64) {
        self.release_frame = Some(frame.max(self.start_frame));
    }

    fn held_secs(&self, sample_rate: f64) -> f64 {
        self.release_frame
            .map(|r| (r - self.start_frame) as f64 / sample_rate)
            .unwrap_or(f64::INFINITY)
    }

    /// Render the sample for absolute `frame`. Silent before the onset.
    pub fn render(&mut self, frame: u64, sample_rate: f64) -> f32 {
        if frame < self.start_frame {
            return 0.0;
        }
        let t = (frame - self.start_frame) as f64 / sample_rate;
        let amp = self.envelope.amplitude(t, self.held_secs(sample_rate));

        let raw = match self.kind {
            VoiceKind::Tone => {
                let s = (self.phase * TAU).sin();
                self.advance(self.freq, sample_rate);
                s
            }
            VoiceKind::Bass => {
                let s = (self.phase * TAU).sin() * 0.8 + (self.phase * 2.0 * TAU).sin() * 0.2;
                self.advance(self.freq, sample_rate);
                s
            }
            VoiceKind::Kick => {
                let s = (self.phase * TAU).sin();
                let sweep = 45.0 + 110.0 * (-t * 35.0).exp();
                self.advance(sweep, sample_rate);
                s
            }
            VoiceKind::Noise { .. } => {
                let white: f64 = self.rng.gen_range(-1.0..1.0);
                // One-pole high-pass keeps the noise bright.
                let out = white - self.filter;
                self.filter += 0.2 * out;
                out
            }
        };

        (raw * amp) as f32 * self.gain
    }

    fn advance(&mut self, freq: f64, sample_rate: f64) {
        self.phase = (self.phase + freq / sample_rate).fract();
    }

    /// Whether the voice can be dropped as of `frame`.
    pub fn is_finished(&self, frame: u64, sample_rate: f64) -> bool {
        if frame < self.start_frame {
            return false;
        }
        let t = (frame - self.start_frame) as f64 / sample_rate;
        self.envelope.is_finished(t, self.held_secs(sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const SR: f64 = 48_000.0;

    fn tone_env() -> Envelope {
        VoiceKind::Tone.envelope()
    }

    #[test]
    fn a4_is_440() {
        assert_approx_eq!(midi_to_freq(69), 440.0);
        assert_approx_eq!(midi_to_freq(81), 880.0);
    }

    #[test]
    fn envelope_shape() {
        let env = tone_env();
        assert_approx_eq!(env.amplitude(0.0, f64::INFINITY), 0.0);
        assert_approx_eq!(env.amplitude(0.01, f64::INFINITY), 1.0);
        assert_approx_eq!(env.amplitude(1.0, f64::INFINITY), 0.6);
        assert_approx_eq!(env.amplitude(-1.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn release_ramps_to_zero() {
        let env = tone_env();
        assert_approx_eq!(env.amplitude(1.0, 1.0), 0.6);
        assert!(env.amplitude(1.1, 1.0) < 0.6);
        assert_approx_eq!(env.amplitude(1.15, 1.0), 0.0);
        assert!(env.is_finished(1.2, 1.0));
        assert!(!env.is_finished(1.2, f64::INFINITY));
    }

    #[test]
    fn percussion_finishes_without_release() {
        let env = VoiceKind::Kick.envelope();
        assert!(!env.is_finished(0.1, f64::INFINITY));
        assert!(env.is_finished(0.5, f64::INFINITY));
    }

    #[test]
    fn voice_silent_before_onset() {
        let mut v = Voice::new(1, VoiceKind::Tone, 69, 1.0, 1000);
        assert_eq!(v.render(10, SR), 0.0);
        assert!(!v.is_finished(10, SR));
    }

    #[test]
    fn voice_sounds_after_onset() {
        let mut v = Voice::new(1, VoiceKind::Tone, 69, 1.0, 0);
        let peak = (0..2000)
            .map(|f| v.render(f, SR).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.3, "peak {peak}");
    }

    #[test]
    fn released_voice_finishes() {
        let mut v = Voice::new(2, VoiceKind::Tone, 60, 0.8, 0);
        v.release_at(4800);
        assert!(!v.is_finished(4800, SR));
        assert!(v.is_finished(4800 + SR as u64, SR));
    }

    #[test]
    fn noise_is_deterministic_per_id() {
        let mut a = Voice::new(7, VoiceKind::Noise { decay: 0.1 }, 38, 1.0, 0);
        let mut b = Voice::new(7, VoiceKind::Noise { decay: 0.1 }, 38, 1.0, 0);
        for f in 0..256 {
            assert_eq!(a.render(f, SR), b.render(f, SR));
        }
    }

    #[test]
    fn track_voicing() {
        use crate::document::default_tracks;
        let kinds: Vec<VoiceKind> = default_tracks().iter().map(VoiceKind::for_track).collect();
        assert_eq!(kinds[0], VoiceKind::Tone);
        assert_eq!(kinds[1], VoiceKind::Bass);
        assert_eq!(kinds[2], VoiceKind::Kick);
        assert_eq!(kinds[4], VoiceKind::Noise { decay: 0.05 });
    }
}
