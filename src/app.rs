use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::board::filter::{column_tickets, AssigneeFilter};
use crate::board::{BoardSyncEngine, BoardView};
use crate::config::AppConfig;
use crate::dnd::{ColumnTarget, DragPayload, DragSource, DropTarget, TicketCursor};
use crate::event::KeyAction;
use crate::model::board::{Board, Ticket};
use crate::model::timer::{ExternalTask, TaskRef, TimerState};
use crate::notifications::NotificationQueue;
use crate::poll::PollHandle;
use crate::timer::{TimerController, ToggleCommand};

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    Tick,
    TasksLoaded(Vec<ExternalTask>),
    BoardsLoaded(Vec<BoardChoice>),
    /// A background toggle, load or move finished.
    Synced,
    Quit,
}

/// A board reachable from a time-tracking project through its links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardChoice {
    pub harvest_project_id: u64,
    pub board: Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Tasks,
    Board,
}

#[derive(Debug, Clone)]
pub struct DragState {
    pub payload: DragPayload,
    pub target_column: usize,
}

#[derive(Debug, Clone)]
pub struct NoteInput {
    pub target: TaskRef,
    pub buffer: String,
    pub cursor: usize,
}

pub struct App {
    pub config: Arc<AppConfig>,
    pub timer: Arc<TimerController>,
    pub board: Arc<BoardSyncEngine>,
    pub notifications: NotificationQueue,
    pub tasks: Vec<ExternalTask>,
    pub selected_task: usize,
    pub loading_tasks: bool,
    pub boards: Vec<BoardChoice>,
    pub selected_board: usize,
    pub focus: Pane,
    pub assignee: AssigneeFilter,
    pub board_column: usize,
    pub board_row: usize,
    pub drag: Option<DragState>,
    pub note_input: Option<NoteInput>,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    pollers: Vec<PollHandle>,
}

impl App {
    pub fn new(
        config: Arc<AppConfig>,
        timer: Arc<TimerController>,
        board: Arc<BoardSyncEngine>,
        notifications: NotificationQueue,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            config,
            timer,
            board,
            notifications,
            tasks: Vec::new(),
            selected_task: 0,
            loading_tasks: true,
            boards: Vec::new(),
            selected_board: 0,
            focus: Pane::Tasks,
            assignee: AssigneeFilter::All,
            board_column: 0,
            board_row: 0,
            drag: None,
            note_input: None,
            should_quit: false,
            action_tx,
            pollers: Vec::new(),
        }
    }

    /// Kick off the initial fetches and the two poll loops.
    pub fn start(&mut self) {
        self.refresh_tasks();
        self.discover_boards();

        let timer = Arc::clone(&self.timer);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let _ = timer.poll_once().await;
            let _ = tx.send(Action::Synced);
        });

        self.pollers
            .push(self.timer.spawn_poll(self.config.polling.timer_interval()));
        self.pollers
            .push(self.board.spawn_poll(self.config.polling.board_interval()));
    }

    /// Cancel the poll loops; in-flight ticks drop their results.
    pub fn stop(&mut self) {
        for poller in self.pollers.drain(..) {
            poller.cancel();
        }
    }

    pub async fn update(&mut self, action: Action) {
        match action {
            Action::Key(key) => self.handle_key(key),
            Action::Tick | Action::Synced => self.clamp_selection(),
            Action::TasksLoaded(tasks) => {
                self.tasks = tasks;
                self.loading_tasks = false;
                self.clamp_selection();
            }
            Action::BoardsLoaded(boards) => {
                info!(count = boards.len(), "boards discovered");
                self.boards = boards;
                self.selected_board = 0;
                if let Some(choice) = self.boards.first().cloned() {
                    self.load_board(choice.board);
                }
            }
            Action::Quit => {
                self.stop();
                self.should_quit = true;
            }
        }
    }

    fn handle_key(&mut self, key: KeyAction) {
        if self.note_input.is_some() {
            self.handle_note_key(key);
            return;
        }
        if self.drag.is_some() {
            self.handle_drag_key(key);
            return;
        }

        match key {
            KeyAction::Up => self.move_selection(-1),
            KeyAction::Down => self.move_selection(1),
            KeyAction::Left if self.focus == Pane::Board => self.move_column(-1),
            KeyAction::Right if self.focus == Pane::Board => self.move_column(1),
            KeyAction::Tab => {
                self.focus = match self.focus {
                    Pane::Tasks => Pane::Board,
                    Pane::Board => Pane::Tasks,
                };
            }
            KeyAction::Select if self.focus == Pane::Board => self.pick_up(),
            KeyAction::Char(' ') if self.focus == Pane::Tasks => {
                if let Some(task) = self.selected_task() {
                    self.toggle(ToggleCommand::task(task.task_ref()));
                }
            }
            KeyAction::Char('n') if self.focus == Pane::Tasks => {
                if let Some(task) = self.selected_task() {
                    self.note_input = Some(NoteInput {
                        target: task.task_ref(),
                        buffer: String::new(),
                        cursor: 0,
                    });
                }
            }
            KeyAction::Char('t') => self.toggle_ticket_timer(),
            KeyAction::Char('a') => self.cycle_assignee(),
            KeyAction::Char('b') => self.cycle_board(),
            KeyAction::Char('x') => {
                if let Some(id) = self.notifications.newest() {
                    self.notifications.dismiss(id);
                }
            }
            KeyAction::Char('q') => {
                self.stop();
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_note_key(&mut self, key: KeyAction) {
        let Some(input) = self.note_input.as_mut() else {
            return;
        };
        match key {
            KeyAction::Char(c) => {
                let at = byte_index(&input.buffer, input.cursor);
                input.buffer.insert(at, c);
                input.cursor += 1;
            }
            KeyAction::Backspace if input.cursor > 0 => {
                input.cursor -= 1;
                let at = byte_index(&input.buffer, input.cursor);
                input.buffer.remove(at);
            }
            KeyAction::Left => input.cursor = input.cursor.saturating_sub(1),
            KeyAction::Right => input.cursor = (input.cursor + 1).min(input.buffer.chars().count()),
            KeyAction::Select => {
                if let Some(input) = self.note_input.take() {
                    self.toggle(ToggleCommand::with_note(input.target, &input.buffer));
                }
            }
            KeyAction::Escape => self.note_input = None,
            _ => {}
        }
    }

    fn handle_drag_key(&mut self, key: KeyAction) {
        let columns = self.board.view().columns.len();
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        match key {
            KeyAction::Left => drag.target_column = drag.target_column.saturating_sub(1),
            KeyAction::Right if drag.target_column + 1 < columns => drag.target_column += 1,
            KeyAction::Select => self.drop_carried(),
            KeyAction::Escape => self.drag = None,
            _ => {}
        }
    }

    pub fn selected_task(&self) -> Option<&ExternalTask> {
        self.tasks.get(self.selected_task)
    }

    pub fn current_board(&self) -> Option<&BoardChoice> {
        self.boards.get(self.selected_board)
    }

    /// Tickets of `column` as shown under the current assignee filter.
    pub fn visible_tickets(&self, view: &BoardView, column: usize) -> Vec<Ticket> {
        view.columns
            .get(column)
            .map(|c| {
                column_tickets(&view.tickets, c, &self.assignee)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn selected_ticket(&self) -> Option<Ticket> {
        let view = self.board.view();
        self.visible_tickets(&view, self.board_column)
            .into_iter()
            .nth(self.board_row)
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.snapshot()
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Pane::Tasks => self.selected_task = step(self.selected_task, delta, self.tasks.len()),
            Pane::Board => {
                let view = self.board.view();
                let rows = self.visible_tickets(&view, self.board_column).len();
                self.board_row = step(self.board_row, delta, rows);
            }
        }
    }

    fn move_column(&mut self, delta: isize) {
        let columns = self.board.view().columns.len();
        self.board_column = step(self.board_column, delta, columns);
        self.board_row = 0;
    }

    fn clamp_selection(&mut self) {
        if self.selected_task >= self.tasks.len() {
            self.selected_task = self.tasks.len().saturating_sub(1);
        }
        let view = self.board.view();
        if self.board_column >= view.columns.len() {
            self.board_column = view.columns.len().saturating_sub(1);
        }
        let rows = self.visible_tickets(&view, self.board_column).len();
        if self.board_row >= rows {
            self.board_row = rows.saturating_sub(1);
        }
    }

    fn pick_up(&mut self) {
        let view = self.board.view();
        let cursor = TicketCursor {
            view: &view,
            filter: &self.assignee,
            column: self.board_column,
            row: self.board_row,
        };
        let Some(payload) = cursor.drag_payload() else {
            return;
        };
        if self.board.is_move_pending(&payload.ticket.key) {
            self.notifications
                .info("busy", format!("{} is still moving", payload.ticket.key));
            return;
        }
        debug!(ticket = %payload.ticket.key, "picked up");
        self.drag = Some(DragState {
            payload,
            target_column: self.board_column,
        });
    }

    fn drop_carried(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let view = self.board.view();
        let Some(column) = view.columns.get(drag.target_column).cloned() else {
            return;
        };
        let target = ColumnTarget::new(Arc::clone(&self.board), column);
        if !target.accepts(&drag.payload) {
            return;
        }
        self.board_column = drag.target_column;
        self.board_row = 0;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let _ = target.drop_payload(drag.payload).await;
            let _ = tx.send(Action::Synced);
        });
    }

    fn toggle(&self, cmd: ToggleCommand) {
        let timer = Arc::clone(&self.timer);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let _ = timer.toggle(cmd).await;
            let _ = tx.send(Action::Synced);
        });
    }

    /// Start (or stop) the timer on the task linked to the selected ticket's column.
    fn toggle_ticket_timer(&mut self) {
        let Some(choice) = self.current_board().cloned() else {
            return;
        };
        let Some(ticket) = self.selected_ticket() else {
            return;
        };
        let view = self.board.view();
        let Some(column) = view.columns.iter().find(|c| c.holds(&ticket.status_id)) else {
            return;
        };
        match self.config.linked_task(
            choice.harvest_project_id,
            &choice.board.mapping_key(),
            &column.name,
        ) {
            Some(task) => self.toggle(ToggleCommand::ticket(task, &ticket)),
            None => {
                self.notifications.info(
                    "no-linked-task",
                    format!("No task linked to column {} on {}", column.name, choice.board.name),
                );
            }
        }
    }

    fn cycle_assignee(&mut self) {
        let options = self.board.view().assignee_options;
        if options.is_empty() {
            return;
        }
        let next = options
            .iter()
            .position(|o| o.filter == self.assignee)
            .map(|i| (i + 1) % options.len())
            .unwrap_or(0);
        self.assignee = options[next].filter.clone();
        self.board_row = 0;
    }

    fn cycle_board(&mut self) {
        if self.boards.len() < 2 {
            return;
        }
        self.selected_board = (self.selected_board + 1) % self.boards.len();
        let board = self.boards[self.selected_board].board.clone();
        self.load_board(board);
    }

    fn load_board(&mut self, board: Board) {
        self.assignee = AssigneeFilter::All;
        self.board_column = 0;
        self.board_row = 0;
        self.drag = None;
        let engine = Arc::clone(&self.board);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let _ = engine.load_board(board).await;
            let _ = tx.send(Action::Synced);
        });
    }

    pub fn refresh_tasks(&mut self) {
        self.loading_tasks = true;
        let timer = Arc::clone(&self.timer);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let tasks = timer.assigned_tasks().await.unwrap_or_default();
            let _ = tx.send(Action::TasksLoaded(tasks));
        });
    }

    fn discover_boards(&self) {
        let config = Arc::clone(&self.config);
        let engine = Arc::clone(&self.board);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let mut choices = Vec::new();
            for (harvest_project_id, linked) in group_links(&config) {
                choices.extend(
                    engine
                        .discover_boards(&linked)
                        .await
                        .into_iter()
                        .map(|board| BoardChoice {
                            harvest_project_id,
                            board,
                        }),
                );
            }
            let _ = tx.send(Action::BoardsLoaded(choices));
        });
    }
}

fn group_links(config: &AppConfig) -> Vec<(u64, Vec<crate::model::board::LinkedProject>)> {
    let mut groups: Vec<(u64, Vec<_>)> = Vec::new();
    for (id, linked) in config.all_linked_projects() {
        match groups.iter_mut().find(|(g, _)| *g == id) {
            Some((_, list)) => list.push(linked),
            None => groups.push((id, vec![linked])),
        }
    }
    groups
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}
