//! Application state and screen flow.
//!
//! The app moves between three screens: track selection, playing and stats.
//! It owns the loaded song, the per-track properties chosen by the player and
//! the devices, which it lends to each play session.

use crate::config::PlayConfig;
use crate::midi::{Song, TrackProperties};
use crate::play::{
    Devices, KeyboardInput, MidiOutput, PlayingState, StatsSummary, TimelineSource, Transition,
};
use anyhow::{Context, Result};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// How long status messages stay visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// The screen currently shown.
pub enum Screen {
    TrackSelection,
    Playing(Box<PlayingState>),
    Stats(StatsSummary),
}

/// Main application state.
pub struct App {
    song: Song,
    properties: Vec<TrackProperties>,
    config: PlayConfig,
    /// Devices not lent to a session.
    devices: Devices,
    /// Computer-keyboard input, shared with the session that polls it.
    keyboard: Option<Rc<RefCell<KeyboardInput>>>,
    pub screen: Screen,
    /// Highlighted row on the track-selection screen.
    pub selected_track: usize,
    status_message: Option<(String, Instant)>,
    last_frame: Instant,
}

impl App {
    /// Creates the app for a loaded song.
    ///
    /// `output` sounds the song; with `keyboard_input` the computer keyboard
    /// becomes the live input and notes on `YouPlay` tracks are judged.
    pub fn new(
        song: Song,
        config: PlayConfig,
        output: Option<Box<dyn MidiOutput>>,
        keyboard_input: bool,
    ) -> Self {
        let properties = song
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, track)| TrackProperties::default_for(track, i))
            .collect();

        let keyboard = keyboard_input.then(|| {
            Rc::new(RefCell::new(KeyboardInput::new(Duration::from_millis(
                config.key_hold_ms,
            ))))
        });
        let devices = Devices {
            output,
            input: keyboard
                .clone()
                .map(|k| Box::new(k) as Box<dyn crate::play::MidiInput>),
        };

        Self {
            song,
            properties,
            config,
            devices,
            keyboard,
            screen: Screen::TrackSelection,
            selected_track: 0,
            status_message: None,
            last_frame: Instant::now(),
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn properties(&self) -> &[TrackProperties] {
        &self.properties
    }

    pub fn has_keyboard_input(&self) -> bool {
        self.keyboard.is_some()
    }

    /// The computer-keyboard input, if enabled.
    pub fn keyboard(&self) -> Option<Ref<'_, KeyboardInput>> {
        self.keyboard.as_ref().map(|k| k.borrow())
    }

    pub fn select_next_track(&mut self) {
        if self.selected_track + 1 < self.properties.len() {
            self.selected_track += 1;
        }
    }

    pub fn select_prev_track(&mut self) {
        self.selected_track = self.selected_track.saturating_sub(1);
    }

    /// Cycles the mode of the highlighted track.
    pub fn cycle_mode(&mut self, forward: bool) {
        if let Some(props) = self.properties.get_mut(self.selected_track) {
            props.mode = if forward {
                props.mode.next()
            } else {
                props.mode.prev()
            };
        }
    }

    /// Gives the highlighted track the next colour.
    pub fn cycle_color(&mut self) {
        if let Some(props) = self.properties.get_mut(self.selected_track) {
            props.color = props.color.next();
        }
    }

    /// Starts a play session with the current track properties.
    pub fn start_playing(&mut self) -> Result<()> {
        let timeline: Box<dyn TimelineSource> = Box::new(self.song.clone());
        let devices = std::mem::take(&mut self.devices);
        let state = PlayingState::init(
            Some(timeline),
            self.properties.clone(),
            devices,
            self.config.clone(),
        )
        .context("Failed to start playing")?;

        self.screen = Screen::Playing(Box::new(state));
        self.last_frame = Instant::now();
        Ok(())
    }

    /// Runs one frame of the current screen.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(delta);
        self.clear_expired_status();
    }

    /// Advances the play session, if any, by `delta` of wall time.
    pub fn advance(&mut self, delta: Duration) {
        let transition = match &mut self.screen {
            Screen::Playing(state) => state.update(delta),
            _ => None,
        };
        if let Some(transition) = transition {
            self.end_session(transition);
        }
    }

    /// Leaves the running session for the track-selection screen.
    pub fn leave_session(&mut self) {
        let transition = match &mut self.screen {
            Screen::Playing(state) => state.exit(),
            _ => return,
        };
        self.end_session(transition);
        self.set_status("Stopped");
    }

    /// Starts the running session over from the lead-in.
    pub fn restart_session(&mut self) {
        if let Screen::Playing(state) = &mut self.screen {
            state.reset();
            self.set_status("Restarted");
        }
    }

    /// Returns from the stats screen.
    pub fn dismiss_stats(&mut self) {
        if matches!(self.screen, Screen::Stats(_)) {
            self.screen = Screen::TrackSelection;
        }
    }

    fn end_session(&mut self, transition: Transition) {
        let Screen::Playing(state) = std::mem::replace(&mut self.screen, Screen::TrackSelection)
        else {
            return;
        };
        let title = state.title().to_string();
        let (devices, stats) = (*state).finish();
        self.devices = devices;

        if transition == Transition::Stats {
            let summary = StatsSummary::new(title, stats);
            tracing::info!(
                "Finished with {:.0} points, {:.1}% hit, grade {}",
                summary.stats.score,
                summary.hit_percent,
                summary.grade
            );
            self.screen = Screen::Stats(summary);
        }
    }

    /// Plays a computer-keyboard key. Returns false if it is not a piano key
    /// or keyboard input is off.
    pub fn press_key(&mut self, key: char) -> bool {
        match &self.keyboard {
            Some(keyboard) => keyboard.borrow_mut().press(key),
            None => false,
        }
    }

    /// Shifts the computer-keyboard mapping by octaves.
    pub fn change_octave(&mut self, delta: i8) {
        if let Some(keyboard) = &self.keyboard {
            let mut keyboard = keyboard.borrow_mut();
            keyboard.change_octave(delta);
            let offset = keyboard.octave_offset;
            drop(keyboard);
            self.set_status(format!("Octave {:+}", offset));
        }
    }

    /// Sets a status message to display.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().map(|(m, _)| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MidiEvent, Note, Track, TrackColor, TrackMode};

    fn test_song() -> Song {
        let mut piano = Track::new("Piano", 0);
        piano.add_note(Note::new(0, 60, 100, 1_000_000, 1_500_000));
        piano.add_event(1_000_000, MidiEvent::note_on(0, 60, 100));
        piano.add_event(1_500_000, MidiEvent::note_off(0, 60));
        let conductor = Track::new("Conductor", 0);
        Song::new("Test Song", vec![piano, conductor])
    }

    #[test]
    fn test_default_properties() {
        let app = App::new(test_song(), PlayConfig::default(), None, true);
        assert_eq!(app.properties()[0].mode, TrackMode::PlayedAutomatically);
        assert_eq!(app.properties()[1].mode, TrackMode::PlayedButHidden);
        assert!(matches!(app.screen, Screen::TrackSelection));
    }

    #[test]
    fn test_track_selection_editing() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, false);
        app.cycle_mode(true);
        assert_eq!(app.properties()[0].mode, TrackMode::YouPlay);
        app.cycle_mode(false);
        app.cycle_mode(false);
        assert_eq!(app.properties()[0].mode, TrackMode::NotPlayed);

        app.select_next_track();
        app.select_next_track();
        assert_eq!(app.selected_track, 1);
        app.cycle_color();
        assert_eq!(app.properties()[1].color, TrackColor::for_index(1).next());
        app.select_prev_track();
        app.select_prev_track();
        assert_eq!(app.selected_track, 0);
    }

    #[test]
    fn test_song_over_shows_stats() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, true);
        app.cycle_mode(true);
        app.start_playing().unwrap();
        assert!(matches!(app.screen, Screen::Playing(_)));

        app.advance(Duration::ZERO);
        app.advance(Duration::from_secs(9));
        match &app.screen {
            Screen::Stats(summary) => {
                assert_eq!(summary.title, "Test Song");
                assert_eq!(summary.stats.notes_user_could_have_played, 1);
                assert_eq!(summary.stats.notes_user_actually_played, 0);
                assert_eq!(summary.grade, "F");
            }
            _ => panic!("expected the stats screen"),
        }
        assert!(app.devices.input.is_some());

        app.dismiss_stats();
        assert!(matches!(app.screen, Screen::TrackSelection));
    }

    #[test]
    fn test_song_over_without_input_returns_to_selection() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, false);
        app.cycle_mode(true);
        app.start_playing().unwrap();
        app.advance(Duration::ZERO);
        app.advance(Duration::from_secs(9));
        assert!(matches!(app.screen, Screen::TrackSelection));
    }

    #[test]
    fn test_leave_session() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, true);
        app.start_playing().unwrap();
        app.leave_session();
        assert!(matches!(app.screen, Screen::TrackSelection));
        assert_eq!(app.status_message(), Some("Stopped"));
        assert!(app.devices.input.is_some());
    }

    #[test]
    fn test_keyboard_press_reaches_session() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, true);
        app.cycle_mode(true);
        app.start_playing().unwrap();
        app.advance(Duration::ZERO);
        // 6.55 s from the lead-in puts the song at 1.05 s.
        app.advance(Duration::from_millis(6_550));

        assert!(app.press_key('q'));
        app.advance(Duration::ZERO);
        match &app.screen {
            Screen::Playing(state) => {
                assert_eq!(state.stats().notes_user_actually_played, 1);
                assert_eq!(state.combo(), 1);
            }
            _ => panic!("expected to still be playing"),
        }
    }

    #[test]
    fn test_keyboard_disabled() {
        let mut app = App::new(test_song(), PlayConfig::default(), None, false);
        assert!(!app.press_key('q'));
        assert!(app.keyboard().is_none());
        app.change_octave(1);
        assert_eq!(app.status_message(), None);
    }
}
