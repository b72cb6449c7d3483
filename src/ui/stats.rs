//! Stats screen shown after a judged play-through.

use super::centered_rect;
use crate::play::StatsSummary;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

fn grade_color(grade: &str) -> Color {
    match grade {
        "A+" | "A" => Color::Green,
        "B" | "C" => Color::Yellow,
        _ => Color::Red,
    }
}

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<18}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

/// Renders the statistics of the finished song.
pub fn render_stats(frame: &mut Frame, area: Rect, summary: &StatsSummary) {
    let popup = centered_rect(60, 70, area);
    let block = Block::default()
        .title(format!(" {} ", summary.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let stats = &summary.stats;
    let lines = vec![
        Line::from(Span::styled(
            summary.grade,
            Style::default()
                .fg(grade_color(summary.grade))
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from(""),
        row("Score", format!("{}", stats.score as i64)),
        row(
            "Notes hit",
            format!(
                "{} / {} ({:.1}%)",
                stats.notes_user_actually_played, stats.notes_user_could_have_played, summary.hit_percent
            ),
        ),
        row("Longest combo", stats.longest_combo.to_string()),
        row(
            "Keys pressed",
            format!("{} ({} stray)", stats.total_notes_user_pressed, stats.stray_notes),
        ),
        row("Average speed", format!("{:.0}%", summary.average_speed)),
        row("Notes in song", stats.total_note_count.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::styled(" Back to tracks", Style::default().fg(Color::DarkGray)),
        ])
        .alignment(Alignment::Center),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
