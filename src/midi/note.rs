//! Playable note representation.
//!
//! A note is a single note-on/note-off pair on one track, placed on the song
//! clock in microseconds, together with its judgment state.

use super::Microseconds;
use serde::{Deserialize, Serialize};

/// Judgment state of a note.
///
/// States only move forward: `UserPlayable` becomes either `UserHit` (the
/// player pressed it in time) or `UserMissed` (the judgment window closed).
/// `AutoPlayed` notes belong to tracks the trainer plays by itself and are
/// never judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteState {
    #[default]
    AutoPlayed,
    UserPlayable,
    UserHit,
    UserMissed,
}

impl NoteState {
    /// Whether the note still waits for a judgment.
    pub fn is_pending(&self) -> bool {
        *self == NoteState::UserPlayable
    }
}

/// Represents a single note with absolute timing and judgment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Index of the owning track within the song.
    pub track_id: usize,

    /// MIDI note number (0-127). 60 = Middle C (C4).
    pub pitch: u8,

    /// Note velocity (1-127).
    pub velocity: u8,

    /// Start time on the song clock.
    pub start: Microseconds,

    /// End time on the song clock. Never earlier than `start`.
    pub end: Microseconds,

    /// Current judgment state.
    pub state: NoteState,
}

impl Note {
    /// Creates a new auto-played note.
    ///
    /// # Arguments
    ///
    /// * `track_id` - Index of the owning track
    /// * `pitch` - MIDI note number (0-127)
    /// * `velocity` - Note velocity (0-127)
    /// * `start` - Start time in microseconds
    /// * `end` - End time in microseconds (clamped to be >= start)
    pub fn new(
        track_id: usize,
        pitch: u8,
        velocity: u8,
        start: Microseconds,
        end: Microseconds,
    ) -> Self {
        Self {
            track_id,
            pitch: pitch.min(127),
            velocity: velocity.min(127),
            start,
            end: end.max(start),
            state: NoteState::AutoPlayed,
        }
    }

    /// Returns the duration of the note in microseconds.
    pub fn duration(&self) -> Microseconds {
        self.end - self.start
    }

    /// Checks if this note overlaps with a given time range.
    ///
    /// # Arguments
    ///
    /// * `start` - Start of the range (inclusive)
    /// * `end` - End of the range (exclusive)
    pub fn overlaps_range(&self, start: Microseconds, end: Microseconds) -> bool {
        self.start < end && self.end > start
    }

    /// Marks a pending note as missed.
    ///
    /// Returns true if the transition fired. Hit, missed and auto-played
    /// notes are left untouched.
    pub fn miss(&mut self) -> bool {
        if self.state.is_pending() {
            self.state = NoteState::UserMissed;
            true
        } else {
            false
        }
    }

    /// Marks a pending note as hit.
    ///
    /// Returns true if the transition fired.
    pub fn hit(&mut self) -> bool {
        if self.state.is_pending() {
            self.state = NoteState::UserHit;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = Note::new(2, 60, 100, 1_000, 2_000);
        assert_eq!(note.track_id, 2);
        assert_eq!(note.pitch, 60);
        assert_eq!(note.duration(), 1_000);
        assert_eq!(note.state, NoteState::AutoPlayed);
    }

    #[test]
    fn test_note_clamping() {
        let note = Note::new(0, 200, 200, 500, 100);
        assert_eq!(note.pitch, 127);
        assert_eq!(note.velocity, 127);
        assert_eq!(note.end, 500);
    }

    #[test]
    fn test_note_overlap() {
        let note = Note::new(0, 60, 100, 100, 300);
        assert!(note.overlaps_range(0, 150));
        assert!(note.overlaps_range(200, 400));
        assert!(!note.overlaps_range(0, 100));
        assert!(!note.overlaps_range(300, 400));
    }

    #[test]
    fn test_transitions_only_leave_pending() {
        let mut note = Note::new(0, 60, 100, 0, 10);
        assert!(!note.miss());
        assert!(!note.hit());
        assert_eq!(note.state, NoteState::AutoPlayed);

        note.state = NoteState::UserPlayable;
        assert!(note.hit());
        assert!(!note.miss());
        assert_eq!(note.state, NoteState::UserHit);

        let mut other = Note::new(0, 60, 100, 0, 10);
        other.state = NoteState::UserPlayable;
        assert!(other.miss());
        assert!(!other.hit());
        assert_eq!(other.state, NoteState::UserMissed);
    }
}
