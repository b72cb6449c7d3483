//! Song container and playback timeline.
//!
//! A song holds every track of an imported MIDI file with event times already
//! converted to microseconds. It also carries the playback clock: advancing the
//! song moves the position forward and hands back the events that came due.

use super::event::MidiEvent;
use super::note::Note;
use super::track::Track;
use super::Microseconds;
use crate::play::TimelineSource;

/// A loaded song with its playback position.
#[derive(Debug, Clone)]
pub struct Song {
    /// Song title, usually the file stem.
    pub name: String,

    tracks: Vec<Track>,

    /// All channel events merged across tracks, as (time, track index, event).
    events: Vec<(Microseconds, usize, MidiEvent)>,

    /// Time of the last note end or event.
    length: Microseconds,

    /// Current playback position. Negative during the lead-in.
    position: Microseconds,

    /// Index of the next event in `events` that has not been emitted.
    next_event: usize,

    lead_out: Microseconds,
}

impl Song {
    /// Creates a song from already-timed tracks.
    ///
    /// Events are merged by time; simultaneous events keep track order and
    /// then file order.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let mut events: Vec<(Microseconds, usize, MidiEvent)> = tracks
            .iter()
            .enumerate()
            .flat_map(|(idx, track)| track.events().iter().map(move |(t, e)| (*t, idx, *e)))
            .collect();
        // Stable sort keeps per-track file order for equal keys.
        events.sort_by_key(|(t, idx, _)| (*t, *idx));

        let length = tracks.iter().map(|t| t.end_time()).max().unwrap_or(0);

        Self {
            name: name.into(),
            tracks,
            events,
            length,
            position: 0,
            next_event: 0,
            lead_out: 0,
        }
    }

    /// Returns all tracks in the song.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Returns the number of tracks in the song.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total number of notes across all tracks.
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.note_count()).sum()
    }

    /// Length of the song without lead-in or lead-out.
    pub fn length_seconds(&self) -> f64 {
        self.length as f64 / 1_000_000.0
    }
}

impl TimelineSource for Song {
    fn advance(&mut self, delta: Microseconds) -> Vec<(usize, MidiEvent)> {
        self.position += delta.max(0);

        let due = self.events[self.next_event..].partition_point(|(t, _, _)| *t <= self.position);
        let emitted = self.events[self.next_event..self.next_event + due]
            .iter()
            .map(|(_, idx, ev)| (*idx, *ev))
            .collect();
        self.next_event += due;
        emitted
    }

    fn position(&self) -> Microseconds {
        self.position
    }

    fn is_complete(&self) -> bool {
        self.position >= self.length + self.lead_out
    }

    fn percentage_complete(&self) -> f64 {
        if self.length <= 0 {
            return 0.0;
        }
        (self.position as f64 / self.length as f64).clamp(0.0, 1.0)
    }

    fn total_length(&self) -> Microseconds {
        self.length
    }

    fn reset(&mut self, lead_in: Microseconds, lead_out: Microseconds) {
        self.position = -lead_in.max(0);
        self.lead_out = lead_out.max(0);
        self.next_event = 0;
    }

    fn notes(&self) -> Vec<Note> {
        self.tracks
            .iter()
            .flat_map(|t| t.notes().iter().cloned())
            .collect()
    }

    fn title(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_track_song() -> Song {
        let mut left = Track::new("Left", 0);
        left.add_note(Note::new(0, 48, 100, 0, 500_000));
        left.add_event(0, MidiEvent::note_on(0, 48, 100));
        left.add_event(500_000, MidiEvent::note_off(0, 48));

        let mut right = Track::new("Right", 1);
        right.add_note(Note::new(1, 60, 100, 0, 1_000_000));
        right.add_event(0, MidiEvent::note_on(1, 60, 100));
        right.add_event(1_000_000, MidiEvent::note_off(1, 60));

        Song::new("Duet", vec![left, right])
    }

    #[test]
    fn test_length_and_notes() {
        let song = two_track_song();
        assert_eq!(song.total_length(), 1_000_000);
        assert_eq!(song.note_count(), 2);
        assert_eq!(song.notes().len(), 2);
        assert_eq!(song.title(), "Duet");
    }

    #[test]
    fn test_lead_in_delays_events() {
        let mut song = two_track_song();
        song.reset(250_000, 100_000);
        assert_eq!(song.position(), -250_000);

        assert!(song.advance(200_000).is_empty());
        let evs = song.advance(50_000);
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[0].0, 0);
        assert_eq!(evs[1].0, 1);
        assert_eq!(song.percentage_complete(), 0.0);
    }

    #[test]
    fn test_events_emitted_once_in_order() {
        let mut song = two_track_song();
        song.reset(0, 0);

        let first = song.advance(0);
        assert_eq!(first.len(), 2);
        assert!(song.advance(0).is_empty());

        let rest = song.advance(2_000_000);
        let keys: Vec<_> = rest.iter().filter_map(|(_, e)| e.note_number()).collect();
        assert_eq!(keys, vec![48, 60]);
        assert!(song.advance(10).is_empty());
    }

    #[test]
    fn test_completion_waits_for_lead_out() {
        let mut song = two_track_song();
        song.reset(0, 500_000);
        song.advance(1_000_000);
        assert!(!song.is_complete());
        assert_eq!(song.percentage_complete(), 1.0);
        song.advance(500_000);
        assert!(song.is_complete());
    }

    #[test]
    fn test_reset_rewinds_events() {
        let mut song = two_track_song();
        song.reset(0, 0);
        song.advance(2_000_000);
        song.reset(0, 0);
        assert_eq!(song.advance(0).len(), 2);
    }

    #[test]
    fn test_negative_delta_ignored() {
        let mut song = two_track_song();
        song.reset(0, 0);
        song.advance(-5_000);
        assert_eq!(song.position(), 0);
    }

    #[test]
    fn test_empty_song() {
        let song = Song::new("Empty", Vec::new());
        assert_eq!(song.total_length(), 0);
        assert_eq!(song.percentage_complete(), 0.0);
        assert!(song.is_complete());
    }
}
