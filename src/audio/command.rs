//! Commands sent from the main thread to the audio thread via ring buffer.

use super::voice::VoiceKind;

/// One-shot instructions for the audio thread. Frames are absolute, counted
/// from stream start.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    /// Start a voice at `at_frame`.
    NoteOn {
        voice: u64,
        kind: VoiceKind,
        pitch: u8,
        gain: f32,
        at_frame: u64,
    },
    /// Release a voice at `at_frame`.
    NoteOff { voice: u64, at_frame: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::{
        traits::{Consumer, Producer, Split},
        HeapRb,
    };

    #[test]
    fn note_on_round_trips_through_ring() {
        let rb = HeapRb::<AudioCommand>::new(16);
        let (mut prod, mut cons) = rb.split();

        let cmd = AudioCommand::NoteOn {
            voice: 3,
            kind: VoiceKind::Tone,
            pitch: 60,
            gain: 0.5,
            at_frame: 44_100,
        };
        prod.try_push(cmd.clone()).unwrap();
        assert_eq!(cons.try_pop(), Some(cmd));
    }

    #[test]
    fn ordering_preserved() {
        let rb = HeapRb::<AudioCommand>::new(16);
        let (mut prod, mut cons) = rb.split();

        for voice in 1..=3 {
            prod.try_push(AudioCommand::NoteOff {
                voice,
                at_frame: 10,
            })
            .unwrap();
        }

        for expected in 1..=3 {
            assert!(matches!(
                cons.try_pop(),
                Some(AudioCommand::NoteOff { voice, .. }) if voice == expected
            ));
        }
        assert!(cons.try_pop().is_none());
    }

    #[test]
    fn full_ring_rejects_push() {
        let rb = HeapRb::<AudioCommand>::new(1);
        let (mut prod, _cons) = rb.split();
        let off = AudioCommand::NoteOff {
            voice: 1,
            at_frame: 0,
        };
        prod.try_push(off.clone()).unwrap();
        assert!(prod.try_push(off).is_err());
    }
}
