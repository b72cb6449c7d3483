//! A running play session.
//!
//! `PlayingState` owns the song timeline, the note working set and the
//! statistics for one play-through. The frame loop calls `update` with the
//! wall-clock time since the previous frame; everything else is read by the
//! presentation layer through accessors.

use super::devices::{Devices, MidiOutput, TimelineSource};
use super::judgment::{sweep, SweepContext};
use super::matching::{match_press, PressOutcome};
use super::notes::NoteSet;
use super::routing::{route_events, ActiveKeys};
use super::scoring::{score_multiplier, Scoring, SongStatistics};
use crate::config::PlayConfig;
use crate::midi::{Microseconds, MidiEventKind, TrackProperties};
use std::time::Duration;
use thiserror::Error;

/// Speed limits and step, in percent.
pub const MIN_SPEED: u32 = 0;
pub const MAX_SPEED: u32 = 400;
pub const SPEED_STEP: u32 = 10;

/// Limits and step for the song time shown on the playfield.
pub const MIN_SHOW_DURATION: Microseconds = 2_500;
pub const MAX_SHOW_DURATION: Microseconds = 10_000_000;
pub const SHOW_DURATION_STEP: Microseconds = 25_000;

const TITLE_FADE_IN_MS: f64 = 350.0;
const TITLE_STAY_MS: f64 = 2500.0;
const TITLE_FADE_OUT_MS: f64 = 500.0;

/// Combo needed before the combo banner shows.
const COMBO_BANNER_MIN: u32 = 5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start a play session without a loaded song")]
    NoSong,
}

/// Where control goes once a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    TrackSelection,
    Stats,
}

/// The combo banner shown during long streaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboBanner {
    pub text: String,
    /// Emphasis that grows with the combo, starting at 20.
    pub size: u32,
}

/// State of one play-through.
pub struct PlayingState {
    timeline: Box<dyn TimelineSource>,
    properties: Vec<TrackProperties>,
    devices: Devices,
    config: PlayConfig,

    notes: NoteSet,
    scoring: Scoring,
    keys: ActiveKeys,

    speed: u32,
    paused: bool,
    first_update: bool,
    show_duration: Microseconds,
    note_offset: i32,

    /// Wall time since the session started.
    elapsed: Duration,
    title_alpha: f64,
    max_title_alpha: f64,

    /// Notes on `YouPlay` tracks at session start.
    look_ahead_you_play_note_count: usize,
    any_you_play_tracks: bool,
}

impl PlayingState {
    /// Starts a session for `song` with the chosen track properties.
    ///
    /// Fails without a song. The session is reset and ready to play.
    pub fn init(
        song: Option<Box<dyn TimelineSource>>,
        properties: Vec<TrackProperties>,
        devices: Devices,
        config: PlayConfig,
    ) -> Result<Self, SessionError> {
        let timeline = song.ok_or(SessionError::NoSong)?;

        let any_you_play_tracks = properties.iter().any(|p| p.mode.is_user_playable());
        let look_ahead_you_play_note_count = timeline
            .notes()
            .iter()
            .filter(|n| {
                properties
                    .get(n.track_id)
                    .is_some_and(|p| p.mode.is_user_playable())
            })
            .count();

        let mut state = Self {
            timeline,
            properties,
            devices,
            speed: config.initial_speed.min(MAX_SPEED),
            show_duration: config
                .show_duration_us
                .clamp(MIN_SHOW_DURATION, MAX_SHOW_DURATION),
            config,
            notes: NoteSet::default(),
            scoring: Scoring::default(),
            keys: ActiveKeys::default(),
            paused: false,
            first_update: true,
            note_offset: 0,
            elapsed: Duration::ZERO,
            title_alpha: 0.0,
            max_title_alpha: 1.0,
            look_ahead_you_play_note_count,
            any_you_play_tracks,
        };
        state.reset();

        tracing::info!(
            "Started \"{}\": {} notes, {} to play yourself",
            state.timeline.title(),
            state.notes.len(),
            state.look_ahead_you_play_note_count
        );
        Ok(state)
    }

    /// Rewinds the song to the lead-in and starts the play-through over.
    pub fn reset(&mut self) {
        self.devices.reset();
        self.timeline
            .reset(self.config.lead_in_us, self.config.lead_out_us);

        self.notes = NoteSet::from_notes(self.timeline.notes());
        self.notes.setup_note_state(&self.properties);
        self.scoring = Scoring::new(self.notes.len());
        self.keys.clear();

        self.note_offset = 0;
        self.max_title_alpha = 1.0;
        self.first_update = true;
        tracing::debug!("Session reset at {}us", self.timeline.position());
    }

    /// Runs one frame.
    ///
    /// Advances the song by `wall_delta` scaled by the speed, routes the events
    /// that came due, judges live input and sweeps the working set. Returns a
    /// transition once the song is over.
    pub fn update(&mut self, wall_delta: Duration) -> Option<Transition> {
        self.elapsed += wall_delta;
        self.update_title_alpha();

        let delta = if self.paused {
            0
        } else {
            let wall_us = wall_delta.as_micros().min(i64::MAX as u128) as i64;
            (wall_us / 100) * self.speed as i64
        };

        if !self.first_update && self.speed > 0 {
            let events = self.timeline.advance(delta);
            let output = self
                .devices
                .output
                .as_deref_mut()
                .map(|o| o as &mut dyn MidiOutput);
            route_events(&events, &self.properties, &mut self.keys, output);
        }
        self.first_update = false;

        self.listen();

        if self.speed > 0 {
            let ctx = SweepContext {
                cur_time: self.timeline.position(),
                half_window: self.config.half_window(),
                input_attached: self.has_input(),
                speed: self.speed,
            };
            sweep(&mut self.notes, &mut self.scoring, ctx);
        }

        if self.timeline.is_complete() {
            self.devices.reset();
            let next = if self.has_input() && self.any_you_play_tracks {
                Transition::Stats
            } else {
                Transition::TrackSelection
            };
            tracing::info!("Song over, going to {:?}", next);
            return Some(next);
        }
        None
    }

    /// Ends the session at the player's request.
    pub fn exit(&mut self) -> Transition {
        self.devices.reset();
        tracing::info!("Session left at {}us", self.timeline.position());
        Transition::TrackSelection
    }

    /// Hands the devices back along with the final statistics.
    pub fn finish(self) -> (Devices, SongStatistics) {
        (self.devices, self.scoring.stats)
    }

    /// Drains live input: echoes it to the output, lights the keyboard and
    /// judges note-ons while the song is moving.
    fn listen(&mut self) {
        let Some(input) = self.devices.input.as_mut() else {
            return;
        };
        let events = input.poll();
        let judging = self.speed > 0 && !self.paused;
        let cur_time = self.timeline.position();

        for event in events {
            if let Some(output) = self.devices.output.as_mut() {
                output.write(&event);
            }
            self.keys.apply_player_event(&event);

            let MidiEventKind::NoteOn { key, .. } = event.kind else {
                continue;
            };
            if judging {
                let outcome = match_press(
                    &mut self.notes,
                    &mut self.scoring,
                    key,
                    cur_time,
                    self.config.half_window(),
                    self.speed,
                );
                if outcome == PressOutcome::Stray {
                    tracing::trace!("stray note {} at {}us", key, cur_time);
                }
            }
        }
    }

    fn update_title_alpha(&mut self) {
        let ms = self.elapsed.as_secs_f64() * 1000.0 * self.speed.max(50) as f64 / 100.0;
        let alpha = if ms <= TITLE_STAY_MS {
            (ms / TITLE_FADE_IN_MS).min(1.0)
        } else {
            let fading = ((TITLE_FADE_OUT_MS - (ms - TITLE_STAY_MS)) / TITLE_FADE_OUT_MS).clamp(0.0, 1.0);
            self.max_title_alpha = fading;
            fading
        };
        self.title_alpha = alpha.min(self.max_title_alpha);
    }

    pub fn speed_up(&mut self) {
        self.set_speed(self.speed.saturating_add(SPEED_STEP));
    }

    pub fn speed_down(&mut self) {
        self.set_speed(self.speed.saturating_sub(SPEED_STEP));
    }

    fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        tracing::debug!("Speed set to {}%", self.speed);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Shows less song time at once, so notes fall faster.
    pub fn shorten_show_duration(&mut self) {
        self.show_duration = (self.show_duration - SHOW_DURATION_STEP).max(MIN_SHOW_DURATION);
    }

    /// Shows more song time at once.
    pub fn lengthen_show_duration(&mut self) {
        self.show_duration = (self.show_duration + SHOW_DURATION_STEP).min(MAX_SHOW_DURATION);
    }

    /// Shifts the keyboard view by an octave.
    pub fn shift_view(&mut self, octaves: i32) {
        self.note_offset += octaves * 12;
    }

    pub fn notes(&self) -> &NoteSet {
        &self.notes
    }

    pub fn stats(&self) -> &SongStatistics {
        &self.scoring.stats
    }

    pub fn combo(&self) -> u32 {
        self.scoring.combo()
    }

    pub fn multiplier(&self) -> f64 {
        score_multiplier(self.scoring.combo())
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn show_duration(&self) -> Microseconds {
        self.show_duration
    }

    pub fn note_offset(&self) -> i32 {
        self.note_offset
    }

    pub fn position(&self) -> Microseconds {
        self.timeline.position()
    }

    pub fn title(&self) -> &str {
        self.timeline.title()
    }

    pub fn properties(&self) -> &[TrackProperties] {
        &self.properties
    }

    pub fn active_keys(&self) -> &ActiveKeys {
        &self.keys
    }

    pub fn has_input(&self) -> bool {
        self.devices.input.is_some()
    }

    pub fn title_alpha(&self) -> f64 {
        self.title_alpha
    }

    /// Text and strength of the centre banner: the pause notice while
    /// paused, else the song title while it fades.
    pub fn title_overlay(&self) -> Option<(&str, f64)> {
        if self.paused {
            Some(("Game Paused", 1.0))
        } else if self.title_alpha > 0.001 {
            Some((self.timeline.title(), self.title_alpha))
        } else {
            None
        }
    }

    /// Current and total time as `m:ss.t`, in wall time at the current
    /// speed, with the percentage played.
    pub fn time_display(&self) -> String {
        let speed = if self.speed == 0 {
            0.1
        } else {
            self.speed as f64 / 100.0
        };
        let tenths = |us: Microseconds| ((us as f64 / 100_000.0) / speed) as i64;
        let total = tenths(self.timeline.total_length());
        let current = tenths(self.timeline.position()).max(0);
        let completion = (self.timeline.percentage_complete() * 100.0) as i64;
        format!(
            "{} / {} ({}%)",
            format_tenths(current),
            format_tenths(total),
            completion
        )
    }

    pub fn song_progress(&self) -> f64 {
        self.timeline.percentage_complete()
    }

    /// Judged and hit notes as fractions of all notes to play, when there are any.
    pub fn note_progress(&self) -> Option<(f64, f64)> {
        if self.look_ahead_you_play_note_count == 0 {
            return None;
        }
        let total = self.look_ahead_you_play_note_count as f64;
        let stats = &self.scoring.stats;
        Some((
            stats.notes_user_could_have_played as f64 / total,
            stats.notes_user_actually_played as f64 / total,
        ))
    }

    pub fn combo_banner(&self) -> Option<ComboBanner> {
        let combo = self.scoring.combo();
        (combo > COMBO_BANNER_MIN).then(|| ComboBanner {
            text: format!("{} Combo!", combo),
            size: 20 + combo / 10,
        })
    }
}

fn format_tenths(tenths: i64) -> String {
    let tenths = tenths.max(0);
    format!("{}:{:02}.{}", tenths / 10 / 60, (tenths / 10) % 60, tenths % 10)
}
