//! Per-track dispatch of timeline events.

use super::devices::MidiOutput;
use crate::midi::{MidiEvent, MidiEventKind, TrackColor, TrackMode, TrackProperties};

/// Keys lit on the on-screen keyboard.
///
/// Auto-played keys carry the colour of the track sounding them; keys the
/// player holds down are tracked separately.
#[derive(Debug, Clone)]
pub struct ActiveKeys {
    auto: [Option<TrackColor>; 128],
    player: [bool; 128],
}

impl Default for ActiveKeys {
    fn default() -> Self {
        Self {
            auto: [None; 128],
            player: [false; 128],
        }
    }
}

impl ActiveKeys {
    /// Colour of the auto-played note sounding on `pitch`, if any.
    pub fn auto_color(&self, pitch: u8) -> Option<TrackColor> {
        self.auto.get(pitch as usize).copied().flatten()
    }

    pub fn is_player_pressed(&self, pitch: u8) -> bool {
        self.player.get(pitch as usize).copied().unwrap_or(false)
    }

    pub fn set_auto(&mut self, pitch: u8, color: Option<TrackColor>) {
        if let Some(slot) = self.auto.get_mut(pitch as usize) {
            *slot = color;
        }
    }

    pub fn set_player(&mut self, pitch: u8, pressed: bool) {
        if let Some(slot) = self.player.get_mut(pitch as usize) {
            *slot = pressed;
        }
    }

    /// Reflects a live input event.
    pub fn apply_player_event(&mut self, event: &MidiEvent) {
        match event.kind {
            MidiEventKind::NoteOn { key, .. } => self.set_player(key, true),
            MidiEventKind::NoteOff { key } => self.set_player(key, false),
            _ => {}
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Routes one frame's events by the mode of the track that emitted them.
///
/// `PlayedButHidden` events are only sounded, `PlayedAutomatically` events are
/// sounded and lit on the keyboard. `YouPlay` and `NotPlayed` events go
/// nowhere. Events of tracks without properties are dropped.
pub fn route_events(
    events: &[(usize, MidiEvent)],
    properties: &[TrackProperties],
    keys: &mut ActiveKeys,
    mut output: Option<&mut dyn MidiOutput>,
) {
    for (track_id, event) in events {
        let Some(props) = properties.get(*track_id) else {
            tracing::warn!("event for unknown track {}", track_id);
            continue;
        };

        let (draw, play) = match props.mode {
            TrackMode::PlayedButHidden => (false, true),
            TrackMode::PlayedAutomatically => (true, true),
            TrackMode::YouPlay | TrackMode::NotPlayed => (false, false),
        };

        if draw {
            match event.kind {
                MidiEventKind::NoteOn { key, .. } => keys.set_auto(key, Some(props.color)),
                MidiEventKind::NoteOff { key } => keys.set_auto(key, None),
                _ => {}
            }
        }

        if play {
            if let Some(out) = output.as_mut() {
                out.write(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::testing::RecordingOutput;

    fn props() -> Vec<TrackProperties> {
        [
            TrackMode::PlayedAutomatically,
            TrackMode::PlayedButHidden,
            TrackMode::YouPlay,
            TrackMode::NotPlayed,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, mode)| TrackProperties {
            mode,
            color: TrackColor::for_index(i),
        })
        .collect()
    }

    #[test]
    fn test_routing_by_mode() {
        let events: Vec<_> = (0..4)
            .map(|track| (track, MidiEvent::note_on(0, 60 + track as u8, 90)))
            .collect();
        let mut keys = ActiveKeys::default();
        let mut output = RecordingOutput::default();

        route_events(&events, &props(), &mut keys, Some(&mut output));

        assert_eq!(output.written(), vec![events[0].1, events[1].1]);
        assert_eq!(keys.auto_color(60), Some(TrackColor::for_index(0)));
        assert_eq!(keys.auto_color(61), None);
        assert_eq!(keys.auto_color(62), None);
        assert_eq!(keys.auto_color(63), None);
    }

    #[test]
    fn test_note_off_clears_key() {
        let mut keys = ActiveKeys::default();
        let events = vec![
            (0, MidiEvent::note_on(0, 60, 90)),
            (0, MidiEvent::note_on(0, 60, 0)),
        ];
        route_events(&events, &props(), &mut keys, None);
        assert_eq!(keys.auto_color(60), None);
    }

    #[test]
    fn test_non_note_events_only_sounded() {
        let mut keys = ActiveKeys::default();
        let mut output = RecordingOutput::default();
        let program = MidiEvent {
            channel: 0,
            kind: MidiEventKind::ProgramChange { program: 5 },
        };
        route_events(&[(0, program), (2, program)], &props(), &mut keys, Some(&mut output));
        assert_eq!(output.written(), vec![program]);
    }

    #[test]
    fn test_player_keys() {
        let mut keys = ActiveKeys::default();
        keys.apply_player_event(&MidiEvent::note_on(0, 64, 100));
        assert!(keys.is_player_pressed(64));
        keys.apply_player_event(&MidiEvent::note_off(0, 64));
        assert!(!keys.is_player_pressed(64));
        keys.set_auto(10, Some(TrackColor::Red));
        keys.clear();
        assert_eq!(keys.auto_color(10), None);
    }
}
