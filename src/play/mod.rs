//! Note timing and judgment.
//!
//! A play session advances the song against wall-clock time, routes the
//! events that come due by track mode, judges live input against the notes
//! left for the player, and keeps score.

mod devices;
mod judgment;
mod matching;
mod notes;
mod routing;
mod scoring;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use devices::{Devices, KeyboardInput, MidiInput, MidiOutput, TimelineSource, KEYBOARD_MAP};
pub use judgment::{sweep, SweepContext, SweepOutcome};
pub use matching::{match_press, PressOutcome};
pub use notes::{NoteId, NoteSet};
pub use routing::{route_events, ActiveKeys};
pub use scoring::{score_multiplier, Scoring, SongStatistics, StatsSummary, MAX_MULTIPLIER};
pub use session::{
    ComboBanner, PlayingState, SessionError, Transition, MAX_SHOW_DURATION, MAX_SPEED,
    MIN_SHOW_DURATION, MIN_SPEED,
};
