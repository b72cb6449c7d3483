//! Matches live key presses to pending notes.

use super::notes::{NoteId, NoteSet};
use super::scoring::Scoring;
use crate::midi::Microseconds;

/// Result of judging one live note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// The press hit this note.
    Hit(NoteId),
    /// No pending note of that pitch was in reach.
    Stray,
}

/// Judges a live note-on of `pitch` at `cur_time`.
///
/// The candidate is the pending note of that pitch whose start is closest to
/// `cur_time`, among notes starting no more than `half_window` ahead and whose
/// miss deadline (`start + half_window`) has not been reached yet. The earlier
/// note wins a tie. A hit is scored immediately; every press is counted.
pub fn match_press(
    notes: &mut NoteSet,
    scoring: &mut Scoring,
    pitch: u8,
    cur_time: Microseconds,
    half_window: Microseconds,
    speed: u32,
) -> PressOutcome {
    let earliest = cur_time - half_window + 1;
    let latest = cur_time + half_window;

    let candidate = notes
        .pending_candidates(pitch, earliest, latest)
        .min_by_key(|(_, n)| (n.start - cur_time).abs())
        .map(|(id, _)| id);

    match candidate {
        Some(id) if notes.mark_hit(id) => {
            scoring.apply_hit(speed);
            scoring.record_press(true);
            tracing::trace!("hit note {} (pitch {}) at {}us", id.index(), pitch, cur_time);
            PressOutcome::Hit(id)
        }
        _ => {
            scoring.record_press(false);
            PressOutcome::Stray
        }
    }
}
