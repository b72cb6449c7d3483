//! MIDI data structures for song playback.
//!
//! This module provides the song model the trainer plays from: notes with
//! absolute microsecond timing, tracks with their playback modes, and the
//! `Song` timeline that emits events as playback advances.

mod event;
mod midi_import;
mod note;
mod song;
mod track;

pub use event::{MidiEvent, MidiEventKind};
pub use midi_import::{import_from_midi, MidiImportError};
pub use note::{Note, NoteState};
pub use song::Song;
pub use track::{Track, TrackColor, TrackMode, TrackProperties};

/// Song time in microseconds. Negative values occur during the lead-in.
pub type Microseconds = i64;

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Lowest pitch on an 88-key piano (A0).
pub const PIANO_LOW: u8 = 21;

/// Highest pitch on an 88-key piano (C8).
pub const PIANO_HIGH: u8 = 108;

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Arguments
///
/// * `note` - MIDI note number (0-127)
///
/// # Returns
///
/// String representation like "C4" or "F#5"
///
/// # Examples
///
/// ```
/// use midifall::midi::note_to_name;
///
/// let name = note_to_name(60); // Middle C
/// assert_eq!(name, "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Returns true if the pitch falls on a black piano key.
#[inline]
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}
