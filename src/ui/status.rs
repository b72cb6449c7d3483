//! Status bar, progress bars and banners of the playing screen.

use super::centered_rect;
use crate::play::PlayingState;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

const MISSED_BAR: Color = Color::Rgb(0xCE, 0x5C, 0x00);
const HIT_BAR: Color = Color::Rgb(0xFC, 0xAF, 0x3E);
const SONG_BAR: Color = Color::Rgb(0x50, 0x50, 0x50);

/// Builds a bar `width` cells wide filled to `fraction`.
fn bar(width: u16, fraction: f64, color: Color) -> Vec<Span<'static>> {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64) as u16).min(width);
    vec![
        Span::styled("█".repeat(filled as usize), Style::default().fg(color)),
        Span::styled(
            "·".repeat((width - filled) as usize),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

/// Two-tone bar: judged notes underneath, hit notes on top.
fn notes_bar(width: u16, judged: f64, hit: f64) -> Vec<Span<'static>> {
    let to_cells = |f: f64| ((f.clamp(0.0, 1.0) * width as f64) as u16).min(width);
    let judged = to_cells(judged);
    let hit = to_cells(hit).min(judged);
    vec![
        Span::styled("█".repeat(hit as usize), Style::default().fg(HIT_BAR)),
        Span::styled(
            "█".repeat((judged - hit) as usize),
            Style::default().fg(MISSED_BAR),
        ),
        Span::styled(
            "·".repeat((width - judged) as usize),
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

/// Renders score, multiplier, speed, time and progress.
pub fn render_status(frame: &mut Frame, area: Rect, state: &PlayingState) {
    let block = Block::default()
        .title(format!(" {} ", state.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let mut spans = vec![
        Span::styled("Score ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:<8}", state.stats().score as i64),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("x{:.1}  ", state.multiplier()),
            Style::default().fg(Color::Rgb(138, 226, 52)),
        ),
        Span::styled("Speed ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}%  ", state.speed()),
            Style::default().fg(Color::Rgb(114, 159, 207)),
        ),
        Span::styled(state.time_display(), Style::default().fg(Color::Gray)),
    ];
    if state.is_paused() {
        spans.push(Span::styled(
            "  [||] PAUSED",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );

    if inner.height < 2 {
        return;
    }
    let bars = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(Rect::new(inner.x, inner.y + 1, inner.width, 1));

    let song_width = bars[0].width.saturating_sub(1);
    frame.render_widget(
        Paragraph::new(Line::from(bar(song_width, state.song_progress(), SONG_BAR))),
        bars[0],
    );
    if let Some((judged, hit)) = state.note_progress() {
        frame.render_widget(
            Paragraph::new(Line::from(notes_bar(bars[1].width, judged, hit))),
            bars[1],
        );
    }
}

/// Renders the title or pause banner and the combo banner over the playfield.
pub fn render_overlays(frame: &mut Frame, area: Rect, state: &PlayingState) {
    if let Some((text, alpha)) = state.title_overlay() {
        let fg = if alpha > 0.66 {
            Color::White
        } else if alpha > 0.33 {
            Color::Gray
        } else {
            Color::DarkGray
        };
        let popup = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    text.to_string(),
                    Style::default().fg(fg).add_modifier(Modifier::BOLD),
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(fg))),
            popup,
        );
    }

    if let Some(banner) = state.combo_banner() {
        let mut style = Style::default().fg(Color::Yellow);
        if banner.size >= 25 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if banner.size >= 30 {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let row = Rect::new(area.x, area.y + area.height.saturating_sub(3), area.width, 1);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(banner.text, style))).alignment(Alignment::Center),
            row,
        );
    }
}
