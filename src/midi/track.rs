//! MIDI track representation.
//!
//! A track holds the notes and channel events read from one track of a
//! Standard MIDI File, already placed on the song clock. How the trainer
//! treats a track during play is chosen separately through `TrackProperties`.

use super::event::MidiEvent;
use super::note::Note;
use super::Microseconds;
use serde::{Deserialize, Serialize};

/// How a track takes part in a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackMode {
    /// Sounded on the output device and shown on the keyboard.
    #[default]
    PlayedAutomatically,
    /// Left for the player; notes are judged against live input.
    YouPlay,
    /// Sounded on the output device but not shown.
    PlayedButHidden,
    /// Neither sounded nor shown.
    NotPlayed,
}

impl TrackMode {
    /// Returns the next mode in track-selection order.
    pub fn next(self) -> Self {
        match self {
            TrackMode::PlayedAutomatically => TrackMode::YouPlay,
            TrackMode::YouPlay => TrackMode::PlayedButHidden,
            TrackMode::PlayedButHidden => TrackMode::NotPlayed,
            TrackMode::NotPlayed => TrackMode::PlayedAutomatically,
        }
    }

    /// Returns the previous mode in track-selection order.
    pub fn prev(self) -> Self {
        match self {
            TrackMode::PlayedAutomatically => TrackMode::NotPlayed,
            TrackMode::YouPlay => TrackMode::PlayedAutomatically,
            TrackMode::PlayedButHidden => TrackMode::YouPlay,
            TrackMode::NotPlayed => TrackMode::PlayedButHidden,
        }
    }

    /// Whether the track's notes are judged.
    pub fn is_user_playable(self) -> bool {
        self == TrackMode::YouPlay
    }

    /// Human-readable label for menus.
    pub fn label(self) -> &'static str {
        match self {
            TrackMode::PlayedAutomatically => "Played Automatically",
            TrackMode::YouPlay => "You Play",
            TrackMode::PlayedButHidden => "Played But Hidden",
            TrackMode::NotPlayed => "Not Played",
        }
    }
}

/// Display colour assigned to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackColor {
    #[default]
    Green,
    Orange,
    Blue,
    Violet,
    Red,
    Yellow,
}

impl TrackColor {
    pub const ALL: [TrackColor; 6] = [
        TrackColor::Green,
        TrackColor::Orange,
        TrackColor::Blue,
        TrackColor::Violet,
        TrackColor::Red,
        TrackColor::Yellow,
    ];

    /// Picks a colour for the n-th track, cycling through the palette.
    pub fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Returns the next colour in the palette.
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

/// Per-track session configuration chosen on the track-selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackProperties {
    pub mode: TrackMode,
    pub color: TrackColor,
}

impl TrackProperties {
    /// Default properties for the track at `index`.
    ///
    /// Tracks without notes still carry program and controller changes, so
    /// they default to being sounded without display.
    pub fn default_for(track: &Track, index: usize) -> Self {
        let mode = if track.has_notes() {
            TrackMode::PlayedAutomatically
        } else {
            TrackMode::PlayedButHidden
        };
        Self {
            mode,
            color: TrackColor::for_index(index),
        }
    }
}

/// Represents a single MIDI track.
///
/// Notes and events are sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    /// Human-readable name for the track.
    pub name: String,

    /// MIDI channel of the first channel event (0-15).
    pub channel: u8,

    /// First program (instrument) seen on the track.
    pub program: Option<u8>,

    notes: Vec<Note>,

    events: Vec<(Microseconds, MidiEvent)>,
}

impl Track {
    /// Creates an empty track.
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            name: name.into(),
            channel: channel.min(15),
            program: None,
            notes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Adds a note, maintaining sorted order by start time.
    pub fn add_note(&mut self, note: Note) {
        // Insert after any notes with the same start so file order is kept.
        let pos = self.notes.partition_point(|n| n.start <= note.start);
        self.notes.insert(pos, note);
    }

    /// Adds a channel event, maintaining sorted order by time.
    pub fn add_event(&mut self, time: Microseconds, event: MidiEvent) {
        let pos = self.events.partition_point(|(t, _)| *t <= time);
        self.events.insert(pos, (time, event));
    }

    /// Returns all notes in the track (sorted by start).
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns all channel events in the track (sorted by time).
    pub fn events(&self) -> &[(Microseconds, MidiEvent)] {
        &self.events
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Returns the number of notes in the track.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Returns the time of the last event on the track.
    pub fn end_time(&self) -> Microseconds {
        let last_note = self.notes.iter().map(|n| n.end).max().unwrap_or(0);
        let last_event = self.events.last().map(|(t, _)| *t).unwrap_or(0);
        last_note.max(last_event)
    }

    /// Returns the lowest and highest pitch used on the track.
    pub fn pitch_range(&self) -> Option<(u8, u8)> {
        let low = self.notes.iter().map(|n| n.pitch).min()?;
        let high = self.notes.iter().map(|n| n.pitch).max()?;
        Some((low, high))
    }
}
