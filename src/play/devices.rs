//! Collaborator seams for a play session.
//!
//! The session drives three outside parties: the song timeline that emits
//! events, an optional output device that sounds them, and an optional live
//! input device the player plays on.

use crate::midi::{Microseconds, MidiEvent, Note};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A song clock that emits channel events as it advances.
pub trait TimelineSource {
    /// Moves the position forward by `delta` and returns the events that came
    /// due, as (track index, event), in time order.
    fn advance(&mut self, delta: Microseconds) -> Vec<(usize, MidiEvent)>;

    /// Current song position.
    fn position(&self) -> Microseconds;

    /// Whether the position has passed the end of the song and its lead-out.
    fn is_complete(&self) -> bool;

    /// Fraction of the song played, in `[0, 1]`.
    fn percentage_complete(&self) -> f64;

    fn total_length(&self) -> Microseconds;

    /// Rewinds to `-lead_in` and arms the lead-out.
    fn reset(&mut self, lead_in: Microseconds, lead_out: Microseconds);

    /// Every note of the song, across all tracks.
    fn notes(&self) -> Vec<Note>;

    fn title(&self) -> &str;
}

/// Something that sounds MIDI events.
pub trait MidiOutput {
    fn write(&mut self, event: &MidiEvent);

    /// Silences everything and returns controllers to their defaults.
    fn reset(&mut self);
}

/// A live source of MIDI events played by the user.
pub trait MidiInput {
    /// Drains the events received since the last poll.
    fn poll(&mut self) -> Vec<MidiEvent>;

    fn reset(&mut self);
}

// A device shared with the key handler stays reachable after it is boxed
// into a session.
impl<T: MidiOutput + ?Sized> MidiOutput for Rc<RefCell<T>> {
    fn write(&mut self, event: &MidiEvent) {
        self.borrow_mut().write(event);
    }

    fn reset(&mut self) {
        self.borrow_mut().reset();
    }
}

impl<T: MidiInput + ?Sized> MidiInput for Rc<RefCell<T>> {
    fn poll(&mut self) -> Vec<MidiEvent> {
        self.borrow_mut().poll()
    }

    fn reset(&mut self) {
        self.borrow_mut().reset();
    }
}

/// The optional devices attached to a session.
#[derive(Default)]
pub struct Devices {
    pub output: Option<Box<dyn MidiOutput>>,
    pub input: Option<Box<dyn MidiInput>>,
}

impl Devices {
    /// Sends a full reset to every attached device.
    pub fn reset(&mut self) {
        if let Some(output) = self.output.as_mut() {
            output.reset();
        }
        if let Some(input) = self.input.as_mut() {
            input.reset();
        }
    }
}

/// Computer keyboard key to MIDI note mapping.
/// Uses a piano-like layout on QWERTY keyboards.
pub const KEYBOARD_MAP: [(char, u8); 25] = [
    // Lower row (Z-M) = C3 to B3
    ('z', 48), // C3
    ('s', 49), // C#3
    ('x', 50), // D3
    ('d', 51), // D#3
    ('c', 52), // E3
    ('v', 53), // F3
    ('g', 54), // F#3
    ('b', 55), // G3
    ('h', 56), // G#3
    ('n', 57), // A3
    ('j', 58), // A#3
    ('m', 59), // B3
    // Upper row (Q-U) = C4 to B4
    ('q', 60), // C4 (Middle C)
    ('2', 61), // C#4
    ('w', 62), // D4
    ('3', 63), // D#4
    ('e', 64), // E4
    ('r', 65), // F4
    ('5', 66), // F#4
    ('t', 67), // G4
    ('6', 68), // G#4
    ('y', 69), // A4
    ('7', 70), // A#4
    ('u', 71), // B4
    ('i', 72), // C5
];

/// Live input from the computer keyboard.
///
/// Terminals report key presses but not releases, so every press is followed
/// by a note-off once `hold` has elapsed.
#[derive(Debug)]
pub struct KeyboardInput {
    channel: u8,
    velocity: u8,
    hold: Duration,
    /// Octave shift applied to the key map.
    pub octave_offset: i8,
    pending: VecDeque<MidiEvent>,
    /// Sounding keys and when they were pressed.
    held: Vec<(u8, Instant)>,
}

impl KeyboardInput {
    pub fn new(hold: Duration) -> Self {
        Self {
            channel: 0,
            velocity: 100,
            hold,
            octave_offset: 0,
            pending: VecDeque::new(),
            held: Vec::new(),
        }
    }

    /// Maps a key to a pitch with the current octave shift.
    pub fn pitch_for_key(&self, key: char) -> Option<u8> {
        let key = key.to_ascii_lowercase();
        let base = KEYBOARD_MAP.iter().find(|(k, _)| *k == key).map(|(_, n)| *n)?;
        let pitch = base as i16 + self.octave_offset as i16 * 12;
        (0..=127).contains(&pitch).then_some(pitch as u8)
    }

    /// Records a key press. Returns false if the key is not a piano key.
    pub fn press(&mut self, key: char) -> bool {
        let Some(pitch) = self.pitch_for_key(key) else {
            return false;
        };
        // Re-striking a sounding key releases it first.
        if let Some(pos) = self.held.iter().position(|(p, _)| *p == pitch) {
            self.held.remove(pos);
            self.pending.push_back(MidiEvent::note_off(self.channel, pitch));
        }
        self.pending
            .push_back(MidiEvent::note_on(self.channel, pitch, self.velocity));
        self.held.push((pitch, Instant::now()));
        true
    }

    /// Shifts the key map by whole octaves, within -3..=3.
    pub fn change_octave(&mut self, delta: i8) {
        self.octave_offset = (self.octave_offset + delta).clamp(-3, 3);
    }

    /// Pitches currently sounding.
    pub fn held_pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.held.iter().map(|(p, _)| *p)
    }

    fn release_expired(&mut self) {
        let hold = self.hold;
        let channel = self.channel;
        let pending = &mut self.pending;
        self.held.retain(|(pitch, pressed)| {
            if pressed.elapsed() >= hold {
                pending.push_back(MidiEvent::note_off(channel, *pitch));
                false
            } else {
                true
            }
        });
    }
}

impl MidiInput for KeyboardInput {
    fn poll(&mut self) -> Vec<MidiEvent> {
        self.release_expired();
        self.pending.drain(..).collect()
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiEventKind;

    #[test]
    fn test_press_emits_note_on() {
        let mut input = KeyboardInput::new(Duration::from_secs(60));
        assert!(input.press('q'));
        assert!(!input.press('['));

        let events = input.poll();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            MidiEventKind::NoteOn {
                key: 60,
                velocity: 100
            }
        );
        assert!(input.poll().is_empty());
        assert_eq!(input.held_pitches().collect::<Vec<_>>(), vec![60]);
    }

    #[test]
    fn test_release_after_hold() {
        let mut input = KeyboardInput::new(Duration::ZERO);
        input.press('Z');
        let events = input.poll();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_note_on());
        assert_eq!(events[1].kind, MidiEventKind::NoteOff { key: 48 });
        assert_eq!(input.held_pitches().count(), 0);
    }

    #[test]
    fn test_restrike_releases_first() {
        let mut input = KeyboardInput::new(Duration::from_secs(60));
        input.press('q');
        input.press('q');
        let events = input.poll();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].kind, MidiEventKind::NoteOff { key: 60 });
        assert!(events[2].is_note_on());
    }

    #[test]
    fn test_octave_shift() {
        let mut input = KeyboardInput::new(Duration::from_secs(1));
        input.change_octave(1);
        assert_eq!(input.pitch_for_key('q'), Some(72));
        input.change_octave(10);
        assert_eq!(input.octave_offset, 3);
        input.change_octave(-10);
        assert_eq!(input.pitch_for_key('z'), Some(12));
    }

    #[test]
    fn test_reset_drops_pending() {
        let mut input = KeyboardInput::new(Duration::from_secs(60));
        input.press('q');
        input.reset();
        assert!(input.poll().is_empty());
    }
}
