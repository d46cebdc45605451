//! Audio callback — runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer, mixes active voices frame by frame,
//! applies a hard output ceiling, and publishes the frame counter
//! that serves as the main thread's audio clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::AudioCommand;
use super::voice::Voice;

/// Output is clamped to `[-CEILING, CEILING]`.
pub const CEILING: f32 = 0.95;

/// Voices beyond this count are dropped on note-on.
pub const MAX_VOICES: usize = 64;

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    voices: Vec<Voice>,
    clock: Arc<AtomicU64>,
    frame: u64,
    channels: u16,
    sample_rate: u32,
}

impl AudioCallback {
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        clock: Arc<AtomicU64>,
        channels: u16,
        sample_rate: u32,
    ) -> Self {
        Self {
            consumer,
            voices: Vec::with_capacity(MAX_VOICES),
            clock,
            frame: 0,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Called by cpal for each buffer of interleaved samples.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            self.apply(cmd);
        }

        let sr = self.sample_rate as f64;
        for frame in output.chunks_mut(self.channels as usize) {
            let mut mix = 0.0f32;
            for voice in self.voices.iter_mut() {
                mix += voice.render(self.frame, sr);
            }
            let sample = mix.clamp(-CEILING, CEILING);
            frame.fill(sample);
            self.frame += 1;
        }

        let now = self.frame;
        self.voices.retain(|v| !v.is_finished(now, sr));
        self.clock.store(now, Ordering::Release);
    }

    fn apply(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::NoteOn {
                voice,
                kind,
                pitch,
                gain,
                at_frame,
            } => {
                if self.voices.len() < MAX_VOICES {
                    self.voices
                        .push(Voice::new(voice, kind, pitch, gain, at_frame));
                }
            }
            AudioCommand::NoteOff { voice, at_frame } => {
                if let Some(v) = self.voices.iter_mut().find(|v| v.id == voice) {
                    v.release_at(at_frame);
                }
            }
        }
    }

    /// Number of live voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
