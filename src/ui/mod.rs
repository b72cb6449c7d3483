//! Terminal user interface.
//!
//! One render function per screen. Renderers read application and session
//! state only; they never change it.

mod keyboard;
mod playfield;
mod stats;
mod status;
mod tracks;

use crate::app::{App, Screen};
use crate::midi::TrackColor;
use crate::play::{KeyboardInput, PlayingState};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub use keyboard::render_keyboard;
pub use playfield::render_playfield;
pub use stats::render_stats;
pub use status::{render_overlays, render_status};
pub use tracks::render_track_selection;

/// Renders the current screen.
pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(size);

    match &app.screen {
        Screen::TrackSelection => render_track_selection(frame, chunks[0], app),
        Screen::Playing(state) => {
            let keyboard = app.keyboard();
            render_playing(frame, chunks[0], state, keyboard.as_deref());
        }
        Screen::Stats(summary) => render_stats(frame, chunks[0], summary),
    }

    if let Some(message) = app.status_message() {
        frame.render_widget(
            Paragraph::new(Line::from(message.to_string()))
                .style(Style::default().fg(Color::Yellow)),
            chunks[1],
        );
    }
}

/// Renders the playing screen: status bar, falling notes and keyboard.
fn render_playing(
    frame: &mut Frame,
    area: Rect,
    state: &PlayingState,
    keyboard: Option<&KeyboardInput>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Status and progress
            Constraint::Min(5),    // Falling notes
            Constraint::Length(6), // Keyboard
        ])
        .split(area);

    render_status(frame, chunks[0], state);
    render_playfield(frame, chunks[1], state);
    render_keyboard(frame, chunks[2], state, keyboard);
    render_overlays(frame, chunks[1], state);
}

/// Terminal colour for a track colour.
pub fn track_color(color: TrackColor) -> Color {
    match color {
        TrackColor::Green => Color::Green,
        TrackColor::Orange => Color::Rgb(0xF5, 0x79, 0x00),
        TrackColor::Blue => Color::Blue,
        TrackColor::Violet => Color::Magenta,
        TrackColor::Red => Color::Red,
        TrackColor::Yellow => Color::Yellow,
    }
}

/// The run of pitches laid out one per column on the playfield and keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchWindow {
    pub low: u8,
    pub count: u16,
}

impl PitchWindow {
    /// Fits as many pitches as `width` allows around middle C, shifted by
    /// `note_offset` semitones and kept inside the MIDI range.
    pub fn new(width: u16, note_offset: i32) -> Self {
        let count = width.min(128);
        let center = 64 + note_offset;
        let low = (center - count as i32 / 2).clamp(0, 128 - count as i32);
        Self {
            low: low as u8,
            count,
        }
    }

    pub fn pitch_at(&self, column: u16) -> Option<u8> {
        (column < self.count).then(|| self.low + column as u8)
    }

    pub fn column_of(&self, pitch: u8) -> Option<u16> {
        let column = pitch.checked_sub(self.low)? as u16;
        (column < self.count).then_some(column)
    }
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_window_centered() {
        let window = PitchWindow::new(88, 0);
        assert_eq!(window.low, 20);
        assert_eq!(window.column_of(60), Some(40));
        assert_eq!(window.pitch_at(40), Some(60));
        assert_eq!(window.pitch_at(88), None);
        assert_eq!(window.column_of(10), None);
    }

    #[test]
    fn test_pitch_window_clamped() {
        assert_eq!(PitchWindow::new(200, 0), PitchWindow { low: 0, count: 128 });
        assert_eq!(PitchWindow::new(40, -120).low, 0);
        assert_eq!(PitchWindow::new(40, 120).low, 88);
        assert_eq!(PitchWindow::new(40, 12).low, 56);
    }
}
