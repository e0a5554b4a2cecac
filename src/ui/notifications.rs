use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::App;
use crate::ui::theme::kind_color;

/// Rows needed to show the newest `max` notifications, 0 when there are none.
pub fn height(app: &App, max: usize) -> u16 {
    match app.notifications.len().min(max) {
        0 => 0,
        n => n as u16 + 2,
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    if area.height < 3 {
        return;
    }
    let shown = area.height.saturating_sub(2) as usize;
    let all = app.notifications.list();
    let skip = all.len().saturating_sub(shown);

    let items: Vec<ListItem> = all
        .iter()
        .skip(skip)
        .map(|n| {
            let color = kind_color(n.kind);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", n.kind.icon()), Style::default().fg(color)),
                Span::styled(n.message.clone(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Notifications ({}) ", all.len())),
    );
    f.render_widget(list, area);
}
