//! cpal-backed [`SoundBackend`].
//!
//! The engine owns the output stream and talks to it only through a lock-free
//! command ring and an atomic frame counter. Nothing here blocks the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Producer, Split},
    HeapRb,
};

use super::callback::AudioCallback;
use super::command::AudioCommand;
use super::voice::VoiceKind;
use super::{AudioError, NoteOptions, ReleaseHandle, SoundBackend};
use crate::document::{default_tracks, Track, TrackId};

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

/// How long a preview note sounds, in seconds.
const PREVIEW_SECS: f64 = 0.3;

/// The audio engine. Owns the cpal stream and the ring buffer producer.
pub struct AudioEngine {
    /// Kept alive for the lifetime of the engine; dropping it stops output.
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
    next_voice: u64,
    voicing: HashMap<TrackId, VoiceKind>,
    ready: bool,
}

impl AudioEngine {
    /// Create and start the audio engine with the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        Self::build_with_device(&device, config.sample_rate().0, config.channels())
    }

    fn build_with_device(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
        let (producer, consumer) = rb.split();
        let clock = Arc::new(AtomicU64::new(0));

        let mut audio_callback = AudioCallback::new(consumer, clock.clone(), channels, sample_rate);

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err: cpal::StreamError| {
            tracing::error!(error = %err, "audio stream error");
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback.process(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        let mut engine = Self {
            _stream: stream,
            producer,
            clock,
            sample_rate,
            channels,
            next_voice: 1,
            voicing: HashMap::new(),
            ready: false,
        };
        engine.configure_tracks(&default_tracks());
        Ok(engine)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<(), AudioError> {
        self.producer
            .try_push(cmd)
            .map_err(|_| AudioError::BufferFull)
    }

    fn to_frame(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }

    fn kind_for(&self, track: &TrackId) -> VoiceKind {
        self.voicing.get(track).copied().unwrap_or(VoiceKind::Tone)
    }

    fn start_voice(&mut self, pitch: u8, track: &TrackId, at: f64, gain: f32) -> Option<u64> {
        let voice = self.next_voice;
        self.next_voice += 1;
        let cmd = AudioCommand::NoteOn {
            voice,
            kind: self.kind_for(track),
            pitch,
            gain,
            at_frame: self.to_frame(at),
        };
        match self.send(cmd) {
            Ok(()) => Some(voice),
            Err(e) => {
                tracing::warn!(error = %e, pitch, "note dropped");
                None
            }
        }
    }
}

impl SoundBackend for AudioEngine {
    fn preload(&mut self) -> bool {
        // Voices are synthesized, so there is nothing to fetch.
        self.ready = true;
        true
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn preview_note(&mut self, pitch: u8, track: &TrackId) {
        if !self.ready {
            return;
        }
        let now = self.current_time();
        if let Some(voice) = self.start_voice(pitch, track, now, 0.7) {
            self.release(ReleaseHandle(voice), now + PREVIEW_SECS);
        }
    }

    fn schedule_note(
        &mut self,
        pitch: u8,
        track: &TrackId,
        at: f64,
        options: NoteOptions,
    ) -> Option<ReleaseHandle> {
        if !self.ready {
            return None;
        }
        self.start_voice(pitch, track, at, options.gain)
            .map(ReleaseHandle)
    }

    fn release(&mut self, handle: ReleaseHandle, at: f64) {
        let cmd = AudioCommand::NoteOff {
            voice: handle.0,
            at_frame: self.to_frame(at),
        };
        if let Err(e) = self.send(cmd) {
            tracing::warn!(error = %e, "release dropped");
        }
    }

    fn configure_tracks(&mut self, tracks: &[Track]) {
        self.voicing = tracks
            .iter()
            .map(|t| (t.id.clone(), VoiceKind::for_track(t)))
            .collect();
    }
}
