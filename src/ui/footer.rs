use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Pane};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    if app.drag.is_some() {
        spans.push(hint("←→", "choose column"));
        spans.push(hint("enter", "drop"));
        spans.push(hint("esc", "cancel"));
    } else {
        match app.focus {
            Pane::Tasks => {
                spans.push(hint("↑↓", "navigate"));
                spans.push(hint("space", "start/stop"));
                spans.push(hint("n", "start with note"));
            }
            Pane::Board => {
                spans.push(hint("↑↓←→", "navigate"));
                spans.push(hint("enter", "pick up"));
                spans.push(hint("t", "ticket timer"));
                spans.push(hint("a", "assignee"));
            }
        }
        spans.push(hint("tab", "switch pane"));
        if app.boards.len() > 1 {
            spans.push(hint("b", "next board"));
        }
        if !app.notifications.is_empty() {
            spans.push(hint("x", "dismiss"));
        }
        spans.push(hint("q", "quit"));
    }

    if let Some(carried) = &app.drag {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" MOVING {} ", carried.payload.ticket.key),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(format!(" {key}:{desc} "), Style::default().fg(Color::DarkGray))
}
