//! Piano keyboard display.
//!
//! Draws one key per playfield column, lit by auto-played tracks and by the
//! player, plus the computer-keyboard mapping and the play controls.

use super::{track_color, PitchWindow};
use crate::midi::{is_black_key, note_to_name};
use crate::play::{KeyboardInput, PlayingState, KEYBOARD_MAP};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

fn key_style(pitch: u8, state: &PlayingState) -> Style {
    let keys = state.active_keys();
    if keys.is_player_pressed(pitch) {
        Style::default().bg(Color::Cyan)
    } else if let Some(color) = keys.auto_color(pitch) {
        Style::default().bg(track_color(color))
    } else if is_black_key(pitch) {
        Style::default().bg(Color::Black)
    } else {
        Style::default().bg(Color::White)
    }
}

/// Key row and octave labels under the playfield columns.
fn build_piano_rows(window: PitchWindow, state: &PlayingState) -> (Line<'static>, Line<'static>) {
    let mut keys = Vec::with_capacity(window.count as usize);
    let mut labels = String::with_capacity(window.count as usize);

    for column in 0..window.count {
        let Some(pitch) = window.pitch_at(column) else {
            break;
        };
        keys.push(Span::styled(" ", key_style(pitch, state)));
        if pitch % 12 == 0 && labels.len() == column as usize {
            labels.push_str(&note_to_name(pitch));
        } else if labels.len() <= column as usize {
            labels.push(' ');
        }
    }
    labels.truncate(window.count as usize);

    (
        Line::from(keys),
        Line::from(Span::styled(labels, Style::default().fg(Color::DarkGray))),
    )
}

/// Which computer keys play which notes at the current octave.
fn build_mapping_line(keyboard: &KeyboardInput) -> Line<'static> {
    let held: Vec<u8> = keyboard.held_pitches().collect();
    let mut spans = vec![Span::styled(
        format!("Octave {:+} ", keyboard.octave_offset),
        Style::default().fg(Color::Gray),
    )];

    for (key, _) in KEYBOARD_MAP.iter() {
        let Some(pitch) = keyboard.pitch_for_key(*key) else {
            continue;
        };
        let style = if held.contains(&pitch) {
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        } else if is_black_key(pitch) {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Black).bg(Color::White)
        };
        spans.push(Span::styled(key.to_ascii_uppercase().to_string(), style));
    }
    Line::from(spans)
}

fn build_controls_line() -> Line<'static> {
    let key_style = Style::default().fg(Color::Yellow);
    let bracket_style = Style::default().fg(Color::DarkGray);
    let desc_style = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    for (key, desc) in [
        ("Space", "Pause "),
        ("←→", "Speed "),
        ("↑↓", "Fall "),
        ("+-", "View "),
        (",.", "Octave "),
        ("Bksp", "Restart "),
        ("Esc", "Tracks"),
    ] {
        spans.push(Span::styled("[", bracket_style));
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(format!("]{}", desc), desc_style));
    }
    Line::from(spans)
}

/// Renders the keyboard at the bottom of the playing screen.
pub fn render_keyboard(
    frame: &mut Frame,
    area: Rect,
    state: &PlayingState,
    keyboard: Option<&KeyboardInput>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let window = PitchWindow::new(inner.width, state.note_offset());
    let offset = inner.width.saturating_sub(window.count) / 2;
    let (keys, labels) = build_piano_rows(window, state);

    frame.render_widget(
        Paragraph::new(keys),
        Rect::new(inner.x + offset, inner.y, window.count, 1),
    );
    if inner.height >= 2 {
        frame.render_widget(
            Paragraph::new(labels),
            Rect::new(inner.x + offset, inner.y + 1, window.count, 1),
        );
    }
    if inner.height >= 3 {
        let line = match keyboard {
            Some(keyboard) => build_mapping_line(keyboard),
            None => build_controls_line(),
        };
        frame.render_widget(
            Paragraph::new(line),
            Rect::new(inner.x, inner.y + 2, inner.width, 1),
        );
    }
    if inner.height >= 4 && keyboard.is_some() {
        frame.render_widget(
            Paragraph::new(build_controls_line()),
            Rect::new(inner.x, inner.y + 3, inner.width, 1),
        );
    }
}
