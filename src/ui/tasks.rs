use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::{App, Pane};
use crate::model::timer::format_elapsed;
use crate::ui::theme::{border, RUNNING};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Pane::Tasks;
    let state = app.timer_state();
    let running = state.running();
    let now = Utc::now();

    let mut items: Vec<ListItem> = Vec::new();
    let mut last_project: Option<u64> = None;
    for (i, task) in app.tasks.iter().enumerate() {
        // Grouped by project, in the order the service lists them.
        if last_project != Some(task.project_id) {
            items.push(ListItem::new(Line::from(Span::styled(
                task.project_name.clone(),
                Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
            ))));
            last_project = Some(task.project_id);
        }

        let selected = focused && i == app.selected_task;
        let entry = running.filter(|e| e.is_for(task.task_ref()));

        let marker = if entry.is_some() {
            Span::styled("● ", Style::default().fg(RUNNING))
        } else {
            Span::raw("  ")
        };
        let name_style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mut spans = vec![marker, Span::styled(task.task_name.clone(), name_style)];

        if let Some(entry) = entry {
            spans.push(Span::styled(
                format!(" {}", format_elapsed(entry.elapsed_secs(now))),
                Style::default().fg(RUNNING),
            ));
            if let Some(note) = &entry.note {
                let max = area.width.saturating_sub(24) as usize;
                let note: String = note.chars().take(max).collect();
                spans.push(Span::styled(format!(" {note}"), Style::default().fg(Color::Gray)));
            }
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    let title = if app.loading_tasks {
        " Tasks (loading...) ".to_string()
    } else {
        match running {
            Some(e) => format!(" Tasks ● {} ", format_elapsed(e.elapsed_secs(now))),
            None => " Tasks ".to_string(),
        }
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border(focused)))
            .title(title),
    );
    f.render_widget(list, area);
}
