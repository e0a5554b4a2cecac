pub mod board;
pub mod footer;
pub mod note_input;
pub mod notifications;
pub mod tasks;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::App;

const MAX_NOTIFICATIONS: usize = 4;

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();

    // Note input (3) replaces the footer (1) while open.
    let bottom_height = if app.note_input.is_some() { 3 } else { 1 };

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(notifications::height(app, MAX_NOTIFICATIONS)),
            Constraint::Length(bottom_height),
        ])
        .split(size);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(vertical[0]);

    tasks::render(f, horizontal[0], app);
    board::render(f, horizontal[1], app);
    notifications::render(f, vertical[1], app);

    if app.note_input.is_some() {
        note_input::render(f, vertical[2], app);
    } else {
        footer::render(f, vertical[2], app);
    }
}
