//! Track-selection screen.
//!
//! Lists the song's tracks with their mode and colour. The highlighted track
//! can be switched between modes before play starts.

use super::track_color;
use crate::app::App;
use crate::midi::{note_to_name, TrackMode};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

/// Height reserved for the control hints at the bottom.
const CONTROLS_HEIGHT: u16 = 2;

fn mode_style(mode: TrackMode) -> Style {
    match mode {
        TrackMode::YouPlay => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        TrackMode::PlayedAutomatically => Style::default().fg(Color::White),
        TrackMode::PlayedButHidden => Style::default().fg(Color::Gray),
        TrackMode::NotPlayed => Style::default().fg(Color::DarkGray),
    }
}

/// Renders the track list with its control hints.
pub fn render_track_selection(frame: &mut Frame, area: Rect, app: &App) {
    let song = app.song();
    let minutes = song.length_seconds() as u64 / 60;
    let seconds = song.length_seconds() as u64 % 60;
    let block = Block::default()
        .title(format!(" {} ({}:{:02}) ", song.name, minutes, seconds))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(CONTROLS_HEIGHT),
        ])
        .split(inner);

    let items: Vec<ListItem> = song
        .tracks()
        .iter()
        .zip(app.properties())
        .enumerate()
        .map(|(i, (track, props))| {
            let selected = i == app.selected_track;
            let name_style = if selected {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let range = track
                .pitch_range()
                .map(|(low, high)| format!("{}-{}", note_to_name(low), note_to_name(high)))
                .unwrap_or_default();

            ListItem::new(Line::from(vec![
                Span::styled("■ ", Style::default().fg(track_color(props.color))),
                Span::styled(format!("{:<24}", track.name), name_style),
                Span::styled(format!("{:<22}", props.mode.label()), mode_style(props.mode)),
                Span::styled(
                    format!("{:>5} notes  {}", track.note_count(), range),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(app.selected_track));
    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, chunks[0], &mut list_state);

    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);
    let mut hints = vec![
        Span::styled("↑↓", key_style),
        Span::styled(" Track  ", desc_style),
        Span::styled("←→", key_style),
        Span::styled(" Mode  ", desc_style),
        Span::styled("c", key_style),
        Span::styled(" Colour  ", desc_style),
        Span::styled("Enter", key_style),
        Span::styled(" Play  ", desc_style),
        Span::styled("q", key_style),
        Span::styled(" Quit", desc_style),
    ];
    if !app.has_keyboard_input() {
        hints.push(Span::styled(
            "   (no input: nothing is judged)",
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(hints)),
        Rect::new(
            chunks[1].x,
            chunks[1].y + chunks[1].height.saturating_sub(1),
            chunks[1].width,
            1,
        ),
    );
}
