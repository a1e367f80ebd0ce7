//! Common UI styles and layout helpers for the procdesk TUI

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::notify::NoticeKind;
use crate::source::Origin;

/// Common UI styles
pub struct Styles;

impl Styles {
    pub fn default() -> Style {
        Style::default()
    }

    pub fn selected() -> Style {
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn inactive() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn active_border() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn inactive_border() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn notice(kind: NoticeKind) -> Style {
        match kind {
            NoticeKind::Info => Style::default().fg(Color::Cyan),
            NoticeKind::Success => Style::default().fg(Color::Green),
            NoticeKind::Warning => Style::default().fg(Color::Yellow),
            NoticeKind::Error => Style::default().fg(Color::Red),
        }
    }

    /// Border of the table: sample data is flagged in yellow
    pub fn origin_border(origin: Option<Origin>) -> Style {
        match origin {
            Some(Origin::Fallback) => Style::default().fg(Color::Yellow),
            _ => Style::default().fg(Color::Blue),
        }
    }
}

/// Cut `text` to at most `max_width` terminal columns, marking the cut with `…`
pub fn fit(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Column widths for a table: the widest cell of each column, capped
pub fn column_widths(labels: &[&str], rows: &[Vec<String>], cap: usize) -> Vec<Constraint> {
    (0..labels.len())
        .map(|i| {
            let widest = rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.width())
                .chain(std::iter::once(labels[i].width()))
                .max()
                .unwrap_or(0);
            Constraint::Length(widest.min(cap) as u16)
        })
        .collect()
}

/// Center a rectangle within another rectangle
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
