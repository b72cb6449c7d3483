//! The note working set.
//!
//! All notes of a song live in one arena sorted by start time. A note's id is
//! its arena index and never changes: judgment states are edited in place and
//! removal only leaves a tombstone. A head index skips the removed prefix so
//! per-frame scans start near the play head instead of at the top of the song.

use crate::midi::{Microseconds, Note, NoteState, TrackProperties};

/// Stable identifier of a note within a `NoteSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(usize);

impl NoteId {
    /// Returns the arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Notes still relevant for judgment or display, ordered by start time.
#[derive(Debug, Clone, Default)]
pub struct NoteSet {
    notes: Vec<Note>,
    removed: Vec<bool>,
    /// First arena index that has not been removed.
    head: usize,
    live: usize,
}

impl NoteSet {
    /// Builds a working set from a song's notes.
    ///
    /// Notes are ordered by start, then track, then pitch. The sort is stable,
    /// so notes equal on all three keep their incoming order.
    pub fn from_notes(mut notes: Vec<Note>) -> Self {
        notes.sort_by_key(|n| (n.start, n.track_id, n.pitch));
        let len = notes.len();
        Self {
            notes,
            removed: vec![false; len],
            head: 0,
            live: len,
        }
    }

    /// Assigns every note the state its track's mode calls for.
    ///
    /// Notes on `YouPlay` tracks become `UserPlayable`; all others become
    /// `AutoPlayed`. Tracks missing from `properties` count as auto-played.
    pub fn setup_note_state(&mut self, properties: &[TrackProperties]) {
        let old = std::mem::take(&mut self.notes);
        self.notes = old
            .into_iter()
            .map(|mut note| {
                let you_play = properties
                    .get(note.track_id)
                    .is_some_and(|p| p.mode.is_user_playable());
                note.state = if you_play {
                    NoteState::UserPlayable
                } else {
                    NoteState::AutoPlayed
                };
                note
            })
            .collect();
    }

    /// Number of notes still in the set.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns a note unless it has been removed.
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        if *self.removed.get(id.0)? {
            None
        } else {
            self.notes.get(id.0)
        }
    }

    /// Records a successful hit on a pending note.
    ///
    /// Returns false if the note was removed or already judged.
    pub fn mark_hit(&mut self, id: NoteId) -> bool {
        match self.slot_mut(id.0) {
            Some(note) => note.hit(),
            None => false,
        }
    }

    /// Iterates the remaining notes in start order.
    pub fn iter(&self) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.notes[self.head..]
            .iter()
            .enumerate()
            .filter(move |(offset, _)| !self.removed[self.head + offset])
            .map(move |(offset, note)| (NoteId(self.head + offset), note))
    }

    /// Remaining notes overlapping the time range `[from, to)`.
    pub fn visible(
        &self,
        from: Microseconds,
        to: Microseconds,
    ) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.iter()
            .take_while(move |(_, n)| n.start < to)
            .filter(move |(_, n)| n.overlaps_range(from, to))
    }

    /// Pending notes of `pitch` whose start lies within `[from, to]`.
    pub fn pending_candidates(
        &self,
        pitch: u8,
        from: Microseconds,
        to: Microseconds,
    ) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.iter()
            .take_while(move |(_, n)| n.start <= to)
            .filter(move |(_, n)| n.pitch == pitch && n.start >= from && n.state.is_pending())
    }

    /// Counts remaining notes in a given state.
    pub fn count_in_state(&self, state: NoteState) -> usize {
        self.iter().filter(|(_, n)| n.state == state).count()
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    /// Size of the arena, including removed notes.
    pub(crate) fn arena_len(&self) -> usize {
        self.notes.len()
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Note> {
        if *self.removed.get(index)? {
            None
        } else {
            self.notes.get_mut(index)
        }
    }

    /// Removes a note for good. Returns false if it was already gone.
    pub(crate) fn remove(&mut self, index: usize) -> bool {
        match self.removed.get_mut(index) {
            Some(flag) if !*flag => {
                *flag = true;
                self.live -= 1;
                while self.head < self.removed.len() && self.removed[self.head] {
                    self.head += 1;
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{TrackColor, TrackMode};

    fn props(modes: &[TrackMode]) -> Vec<TrackProperties> {
        modes
            .iter()
            .map(|&mode| TrackProperties {
                mode,
                color: TrackColor::Green,
            })
            .collect()
    }

    fn sample_set() -> NoteSet {
        NoteSet::from_notes(vec![
            Note::new(1, 64, 100, 1_000, 2_000),
            Note::new(0, 60, 100, 0, 500),
            Note::new(0, 62, 100, 1_000, 1_500),
            Note::new(1, 67, 100, 3_000, 4_000),
        ])
    }

    #[test]
    fn test_sorted_by_start_then_track() {
        let set = sample_set();
        let order: Vec<_> = set.iter().map(|(_, n)| (n.start, n.track_id)).collect();
        assert_eq!(order, vec![(0, 0), (1_000, 0), (1_000, 1), (3_000, 1)]);
    }

    #[test]
    fn test_setup_note_state_follows_modes() {
        let mut set = sample_set();
        set.setup_note_state(&props(&[TrackMode::PlayedAutomatically, TrackMode::YouPlay]));

        for (_, note) in set.iter() {
            let expected = if note.track_id == 1 {
                NoteState::UserPlayable
            } else {
                NoteState::AutoPlayed
            };
            assert_eq!(note.state, expected);
        }

        set.setup_note_state(&props(&[TrackMode::YouPlay]));
        assert_eq!(set.count_in_state(NoteState::UserPlayable), 2);
        assert_eq!(set.count_in_state(NoteState::AutoPlayed), 2);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let modes = props(&[TrackMode::YouPlay, TrackMode::PlayedButHidden]);
        let mut set = sample_set();
        set.setup_note_state(&modes);
        let first: Vec<_> = set
            .iter()
            .map(|(_, n)| (n.track_id, n.start, n.end, n.state))
            .collect();
        set.setup_note_state(&modes);
        let second: Vec<_> = set
            .iter()
            .map(|(_, n)| (n.track_id, n.start, n.end, n.state))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_removal_is_final() {
        let mut set = sample_set();
        assert_eq!(set.len(), 4);

        assert!(set.remove(1));
        assert!(!set.remove(1));
        assert_eq!(set.len(), 3);
        assert_eq!(set.head(), 0);
        assert!(set.get(NoteId(1)).is_none());
        assert!(set.slot_mut(1).is_none());

        assert!(set.remove(0));
        assert_eq!(set.head(), 2);
        assert_eq!(set.iter().count(), 2);
        assert_eq!(set.arena_len(), 4);
    }

    #[test]
    fn test_mark_hit_only_on_pending() {
        let mut set = sample_set();
        set.setup_note_state(&props(&[TrackMode::YouPlay, TrackMode::PlayedAutomatically]));

        let (first, _) = set.iter().next().unwrap();
        assert!(set.mark_hit(first));
        assert!(!set.mark_hit(first));
        assert_eq!(set.get(first).unwrap().state, NoteState::UserHit);

        let auto = set
            .iter()
            .find(|(_, n)| n.track_id == 1)
            .map(|(id, _)| id)
            .unwrap();
        assert!(!set.mark_hit(auto));

        set.remove(first.index());
        assert!(!set.mark_hit(first));
    }

    #[test]
    fn test_visible_range() {
        let set = sample_set();
        let pitches: Vec<_> = set.visible(400, 1_200).map(|(_, n)| n.pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64]);
        assert_eq!(set.visible(4_000, 9_000).count(), 0);
    }

    #[test]
    fn test_pending_candidates() {
        let mut set = sample_set();
        set.setup_note_state(&props(&[TrackMode::YouPlay, TrackMode::YouPlay]));
        assert_eq!(set.pending_candidates(62, 500, 1_500).count(), 1);
        assert_eq!(set.pending_candidates(62, 1_001, 1_500).count(), 0);
        assert_eq!(set.pending_candidates(67, 0, 2_999).count(), 0);
    }
}
