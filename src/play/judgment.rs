//! The per-frame judgment sweep.
//!
//! Walks the working set in start order once the song position has advanced,
//! closing judgment windows and dropping notes that can no longer be played
//! or seen.

use super::notes::NoteSet;
use super::scoring::Scoring;
use crate::midi::{Microseconds, NoteState};

/// What one sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Notes that moved from `UserPlayable` to `UserMissed`.
    pub newly_missed: usize,
    /// Notes removed from the working set.
    pub removed: usize,
    /// Removed notes whose final state was `UserMissed`.
    pub misses_scored: usize,
}

/// Parameters of one sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepContext {
    /// Song position after this frame's advance.
    pub cur_time: Microseconds,
    /// Half of the judgment window; a note's miss deadline is `start + half_window`.
    pub half_window: Microseconds,
    /// Miss detection only runs with a live input attached.
    pub input_attached: bool,
    /// Playback speed in percent, weighted into the statistics on a miss.
    pub speed: u32,
}

/// Sweeps the working set at `ctx.cur_time`.
///
/// For each note in start order:
/// 1. a pending note whose deadline has been reached becomes `UserMissed`
///    (only with an input attached);
/// 2. the sweep stops at the first note that starts in the future;
/// 3. a note whose interval and deadline both lie in the past is removed, and
///    a missed note's scoring effect is applied exactly then. `AutoPlayed`
///    notes have no deadline and go as soon as they end.
///
/// Hit notes are never touched by step 1, so a hit recorded before the
/// deadline always stands.
pub fn sweep(notes: &mut NoteSet, scoring: &mut Scoring, ctx: SweepContext) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();
    let cur_time = ctx.cur_time;

    for index in notes.head()..notes.arena_len() {
        let Some(note) = notes.slot_mut(index) else {
            continue;
        };
        let deadline = note.start + ctx.half_window;

        if ctx.input_attached && note.state.is_pending() && deadline <= cur_time && note.miss() {
            outcome.newly_missed += 1;
        }

        if note.start > cur_time {
            break;
        }

        let window_closed = note.state == NoteState::AutoPlayed || deadline < cur_time;
        if note.end < cur_time && window_closed {
            let missed = note.state == NoteState::UserMissed;
            if notes.remove(index) {
                outcome.removed += 1;
                if missed {
                    scoring.apply_miss(ctx.speed);
                    outcome.misses_scored += 1;
                }
            }
        }
    }

    if outcome.newly_missed > 0 || outcome.misses_scored > 0 {
        tracing::debug!(
            "sweep at {}us: {} missed, {} removed, {} misses scored",
            cur_time,
            outcome.newly_missed,
            outcome.removed,
            outcome.misses_scored
        );
    }
    outcome
}
