use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Pane};
use crate::ui::theme::{border, priority_color, FOCUS};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Pane::Board;
    let view = app.board.view();

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border(focused)))
        .title(title(app, view.loading));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    if view.board.is_none() {
        let hint = if app.boards.is_empty() {
            "No linked boards. Add [[links]] to ~/.timeboard/config.toml"
        } else {
            "Loading board..."
        };
        f.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(inner);

    let filter_label = view
        .assignee_options
        .iter()
        .find(|o| o.filter == app.assignee)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| app.assignee.to_string());
    let sprint = view.sprint.as_ref().map(|s| s.name.as_str()).unwrap_or("no active sprint");
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!(" {sprint} "), Style::default().fg(Color::Gray)),
            Span::styled(format!(" assignee: {filter_label} "), Style::default().fg(Color::DarkGray)),
        ])),
        rows[0],
    );

    if view.columns.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = view
        .columns
        .iter()
        .map(|_| Constraint::Ratio(1, view.columns.len() as u32))
        .collect();
    let lanes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(rows[1]);

    let carried = app.drag.as_ref();
    for (ci, column) in view.columns.iter().enumerate() {
        let tickets = app.visible_tickets(&view, ci);
        let is_target = carried.is_some_and(|d| d.target_column == ci);
        let is_current = focused && carried.is_none() && ci == app.board_column;

        let items: Vec<ListItem> = tickets
            .iter()
            .enumerate()
            .map(|(ri, ticket)| {
                let selected = is_current && ri == app.board_row;
                let lifted = carried.is_some_and(|d| d.payload.ticket.key == ticket.key);
                let moving = app.board.is_move_pending(&ticket.key);

                let key_style = if selected {
                    Style::default().fg(FOCUS).add_modifier(Modifier::BOLD)
                } else if lifted {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::DIM)
                } else {
                    Style::default().fg(priority_color(ticket.priority_rank))
                };
                let mut spans = vec![Span::styled(format!("{} ", ticket.key), key_style)];
                if moving {
                    spans.push(Span::styled("⟳ ", Style::default().fg(Color::Yellow)));
                }
                let max = lanes[ci].width.saturating_sub(ticket.key.len() as u16 + 4) as usize;
                let summary: String = ticket.summary.chars().take(max).collect();
                spans.push(Span::raw(summary));
                ListItem::new(Line::from(spans))
            })
            .collect();

        let lane_color = if is_target {
            Color::Yellow
        } else if is_current {
            FOCUS
        } else {
            Color::DarkGray
        };
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(lane_color))
                .title(format!(" {} ({}) ", column.name, tickets.len())),
        );
        f.render_widget(list, lanes[ci]);
    }
}

fn title(app: &App, loading: bool) -> String {
    let name = app
        .current_board()
        .map(|c| c.board.name.clone())
        .unwrap_or_else(|| "Board".to_string());
    let position = if app.boards.len() > 1 {
        format!(" [{}/{}]", app.selected_board + 1, app.boards.len())
    } else {
        String::new()
    };
    if loading {
        format!(" {name}{position} (loading...) ")
    } else {
        format!(" {name}{position} ")
    }
}
