//! Channel events emitted by the song timeline and read from input devices.

use serde::{Deserialize, Serialize};

/// The payload of a channel event.
///
/// Only the messages the trainer routes are kept. Note-on with velocity 0
/// is stored as `NoteOff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    ProgramChange { program: u8 },
    Controller { controller: u8, value: u8 },
    /// 14-bit bend value, centre 8192.
    PitchBend { value: u16 },
}

/// A MIDI channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// MIDI channel (0-15).
    pub channel: u8,
    pub kind: MidiEventKind,
}

impl MidiEvent {
    /// Creates a note-on event. A zero velocity yields a note-off.
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        let kind = if velocity == 0 {
            MidiEventKind::NoteOff { key }
        } else {
            MidiEventKind::NoteOn { key, velocity }
        };
        Self {
            channel: channel.min(15),
            kind,
        }
    }

    /// Creates a note-off event.
    pub fn note_off(channel: u8, key: u8) -> Self {
        Self {
            channel: channel.min(15),
            kind: MidiEventKind::NoteOff { key },
        }
    }

    /// Returns the note number for note-on/note-off events.
    pub fn note_number(&self) -> Option<u8> {
        match self.kind {
            MidiEventKind::NoteOn { key, .. } | MidiEventKind::NoteOff { key } => Some(key),
            _ => None,
        }
    }

    /// Returns the velocity of a note event (0 for note-off).
    pub fn note_velocity(&self) -> Option<u8> {
        match self.kind {
            MidiEventKind::NoteOn { velocity, .. } => Some(velocity),
            MidiEventKind::NoteOff { .. } => Some(0),
            _ => None,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, MidiEventKind::NoteOn { .. })
    }

    pub fn is_note_event(&self) -> bool {
        self.note_number().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity_is_note_off() {
        let ev = MidiEvent::note_on(0, 60, 0);
        assert_eq!(ev.kind, MidiEventKind::NoteOff { key: 60 });
        assert!(!ev.is_note_on());
        assert_eq!(ev.note_velocity(), Some(0));
    }

    #[test]
    fn test_note_accessors() {
        let ev = MidiEvent::note_on(3, 64, 90);
        assert_eq!(ev.note_number(), Some(64));
        assert_eq!(ev.note_velocity(), Some(90));
        assert!(ev.is_note_event());

        let pc = MidiEvent {
            channel: 3,
            kind: MidiEventKind::ProgramChange { program: 5 },
        };
        assert_eq!(pc.note_number(), None);
        assert!(!pc.is_note_event());
    }

    #[test]
    fn test_channel_clamped() {
        assert_eq!(MidiEvent::note_off(40, 60).channel, 15);
    }
}
