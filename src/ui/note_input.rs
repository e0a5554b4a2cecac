use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(input) = &app.note_input else {
        return;
    };

    let task = app
        .tasks
        .iter()
        .find(|t| t.task_ref() == input.target)
        .map(|t| t.task_name.as_str())
        .unwrap_or("task");

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Note for {task} (enter to start, esc to cancel) "));

    let paragraph = Paragraph::new(Line::from(Span::raw(input.buffer.clone()))).block(block);
    f.render_widget(paragraph, area);

    let x = area.x + 1 + input.cursor as u16;
    let y = area.y + 1;
    f.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), y));
}
