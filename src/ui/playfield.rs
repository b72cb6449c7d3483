//! Falling-note playfield.
//!
//! Time runs bottom to top: the bottom row is the current song position and
//! the top row is `show_duration` ahead of it. Each column is one pitch,
//! aligned with the keyboard below.

use super::{track_color, PitchWindow};
use crate::midi::{Microseconds, Note, NoteState, TrackMode};
use crate::play::PlayingState;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Glyph and style of one playfield cell.
type Cell = (char, Style);

const EMPTY: Cell = (' ', Style::new());

/// Row of the grid containing song time `t`, or None if off screen.
fn row_of(t: Microseconds, position: Microseconds, show: Microseconds, height: u16) -> Option<u16> {
    let offset = t - position;
    if offset < 0 || offset >= show || height == 0 {
        return None;
    }
    let from_bottom = (offset as i128 * height as i128 / show as i128) as u16;
    Some(height - 1 - from_bottom)
}

fn note_cell(note: &Note, color: Color) -> Cell {
    match note.state {
        NoteState::AutoPlayed => ('█', Style::default().fg(color)),
        NoteState::UserPlayable => ('▓', Style::default().fg(color).add_modifier(Modifier::BOLD)),
        NoteState::UserHit => (
            '█',
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        NoteState::UserMissed => ('░', Style::default().fg(Color::DarkGray)),
    }
}

/// Renders the falling notes.
pub fn render_playfield(frame: &mut Frame, area: Rect, state: &PlayingState) {
    let block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let window = PitchWindow::new(inner.width, state.note_offset());
    let position = state.position();
    let show = state.show_duration().max(1);
    let height = inner.height;
    let mut grid = vec![vec![EMPTY; window.count as usize]; height as usize];

    // The judgment line sits where notes are due.
    if let Some(row) = grid.last_mut() {
        for cell in row.iter_mut() {
            *cell = ('─', Style::default().fg(Color::DarkGray));
        }
    }

    for (_, note) in state.notes().visible(position, position + show) {
        let props = state.properties().get(note.track_id);
        let Some(props) = props.filter(|p| {
            matches!(p.mode, TrackMode::PlayedAutomatically | TrackMode::YouPlay)
        }) else {
            continue;
        };
        let Some(column) = window.column_of(note.pitch) else {
            continue;
        };

        let last = position + show - 1;
        let bottom = row_of(note.start.clamp(position, last), position, show, height);
        let top = row_of(note.end.clamp(position, last), position, show, height);
        let (Some(top), Some(bottom)) = (top, bottom) else {
            continue;
        };
        let cell = note_cell(note, track_color(props.color));
        for row in top..=bottom {
            grid[row as usize][column as usize] = cell;
        }
    }

    let lines: Vec<Line> = grid
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(glyph, style)| Span::styled(glyph.to_string(), style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let offset = inner.width.saturating_sub(window.count) / 2;
    let grid_area = Rect::new(inner.x + offset, inner.y, window.count, inner.height);
    frame.render_widget(Paragraph::new(lines), grid_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_mapping() {
        // 10 rows over one second: each row covers 100 ms.
        assert_eq!(row_of(0, 0, 1_000_000, 10), Some(9));
        assert_eq!(row_of(99_999, 0, 1_000_000, 10), Some(9));
        assert_eq!(row_of(100_000, 0, 1_000_000, 10), Some(8));
        assert_eq!(row_of(999_999, 0, 1_000_000, 10), Some(0));
        assert_eq!(row_of(1_000_000, 0, 1_000_000, 10), None);
        assert_eq!(row_of(-1, 0, 1_000_000, 10), None);
    }
}
