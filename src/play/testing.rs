//! Deterministic collaborators for session tests.
//!
//! The output and input fakes share their state through `Rc`, so a test keeps
//! a clone as a handle after boxing the device into a session.

use super::devices::{MidiInput, MidiOutput, TimelineSource};
use crate::midi::{Microseconds, MidiEvent, Note};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A timeline built directly from notes and events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTimeline {
    title: String,
    notes: Vec<Note>,
    /// (time, track, event), sorted by time.
    events: Vec<(Microseconds, usize, MidiEvent)>,
    length: Microseconds,
    position: Microseconds,
    next_event: usize,
    lead_out: Microseconds,
}

impl ScriptedTimeline {
    /// A timeline whose events are the note-on/note-off pairs of `notes`.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let mut events = Vec::new();
        for note in &notes {
            events.push((note.start, note.track_id, MidiEvent::note_on(0, note.pitch, note.velocity)));
            events.push((note.end, note.track_id, MidiEvent::note_off(0, note.pitch)));
        }
        events.sort_by_key(|(t, track, _)| (*t, *track));
        let length = notes.iter().map(|n| n.end).max().unwrap_or(0);
        Self {
            title: "Scripted".to_string(),
            notes,
            events,
            length,
            ..Default::default()
        }
    }
}

impl TimelineSource for ScriptedTimeline {
    fn advance(&mut self, delta: Microseconds) -> Vec<(usize, MidiEvent)> {
        self.position += delta.max(0);
        let mut due = Vec::new();
        while let Some((t, track, ev)) = self.events.get(self.next_event) {
            if *t > self.position {
                break;
            }
            due.push((*track, *ev));
            self.next_event += 1;
        }
        due
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
        self.position = -lead_in;
        self.lead_out = lead_out;
        self.next_event = 0;
    }

    fn notes(&self) -> Vec<Note> {
        self.notes.clone()
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Default)]
struct Recorded {
    written: Vec<MidiEvent>,
    resets: usize,
}

/// Output device that remembers what it was sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    inner: Rc<RefCell<Recorded>>,
}

impl RecordingOutput {
    pub fn written(&self) -> Vec<MidiEvent> {
        self.inner.borrow().written.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.inner.borrow().resets
    }
}

impl MidiOutput for RecordingOutput {
    fn write(&mut self, event: &MidiEvent) {
        self.inner.borrow_mut().written.push(*event);
    }

    fn reset(&mut self) {
        self.inner.borrow_mut().resets += 1;
    }
}

/// Input device fed by the test.
#[derive(Debug, Clone, Default)]
pub struct QueuedInput {
    queue: Rc<RefCell<VecDeque<MidiEvent>>>,
    resets: Rc<RefCell<usize>>,
}

impl QueuedInput {
    /// Queues an event for the next poll.
    pub fn push(&self, event: MidiEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    pub fn reset_count(&self) -> usize {
        *self.resets.borrow()
    }
}

impl MidiInput for QueuedInput {
    fn poll(&mut self) -> Vec<MidiEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    fn reset(&mut self) {
        self.queue.borrow_mut().clear();
        *self.resets.borrow_mut() += 1;
    }
}
