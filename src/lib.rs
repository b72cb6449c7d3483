//! midifall - A terminal MIDI playback trainer.
//!
//! Plays a MIDI song with notes falling toward an on-screen keyboard and,
//! when a live input is attached, judges the player's timing on the tracks
//! they chose to play themselves.

pub mod app;
pub mod audio;
pub mod config;
pub mod midi;
pub mod play;
pub mod ui;

// Re-export commonly used types
pub use app::{App, Screen};
pub use audio::AudioEngine;
pub use config::{ConfigError, PlayConfig};
pub use midi::{import_from_midi, MidiImportError, Note, NoteState, Song, Track, TrackMode};
pub use play::{PlayingState, SessionError, StatsSummary, TimelineSource, Transition};
