//! Board, sprint and ticket state for the selected issue-tracking board.
//!
//! [`BoardSyncEngine`] keeps one [`BoardView`] behind a short-lived lock.
//! Every fetch captures the board epoch (bumped on board switch) and the
//! ticket revision (bumped when a move lands) before its first await, and
//! applies its result only if both are unchanged afterwards.

pub mod filter;
pub mod transition;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::model::board::{Board, Column, LinkedProject, Profile, ProfileIdentity, Sprint, Ticket, Transition};
use crate::model::notification::Notification;
use crate::notifications::NotificationQueue;
use crate::poll::{spawn_poller, PollHandle};
use crate::providers::IssueTracker;
use filter::{assignee_options, AssigneeOption};
use transition::{resolve, Resolution};

pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub board: Option<Board>,
    pub columns: Vec<Column>,
    pub sprint: Option<Sprint>,
    pub tickets: Vec<Ticket>,
    pub transitions: Vec<Transition>,
    pub assignee_options: Vec<AssigneeOption>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Applied,
    /// The board changed or a move landed while the fetch was in flight.
    Stale,
    NoBoard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { transition_id: String },
    AlreadyInPlace,
    /// A move for this ticket is still in flight.
    Busy,
}

#[derive(Default)]
struct Shared {
    view: BoardView,
    epoch: u64,
    revision: u64,
}

/// Marks a ticket as mid-move until dropped.
struct PendingMove<'a> {
    pending: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for PendingMove<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.key);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct BoardSyncEngine {
    client: Arc<dyn IssueTracker>,
    notifications: NotificationQueue,
    shared: Mutex<Shared>,
    pending_moves: Mutex<HashSet<String>>,
}

impl BoardSyncEngine {
    pub fn new(client: Arc<dyn IssueTracker>, notifications: NotificationQueue) -> Self {
        Self {
            client,
            notifications,
            shared: Mutex::new(Shared::default()),
            pending_moves: Mutex::new(HashSet::new()),
        }
    }

    pub fn view(&self) -> BoardView {
        lock(&self.shared).view.clone()
    }

    pub fn is_move_pending(&self, ticket_key: &str) -> bool {
        lock(&self.pending_moves).contains(ticket_key)
    }

    /// Switch to `board` and fetch its columns, sprint, tickets and transitions.
    pub async fn load_board(&self, board: Board) -> Result<Refresh> {
        let epoch = {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.view = BoardView {
                board: Some(board.clone()),
                loading: true,
                ..BoardView::default()
            };
            shared.epoch
        };
        info!(board_id = board.id, board = %board.name, "loading board");

        let fetched = async {
            let columns = self.client.board_columns(board.id, &board.profile).await?;
            let (sprint, tickets) = self.fetch_sprint_tickets(&board).await?;
            let transitions = self.fetch_transitions(&board.profile, &tickets).await;
            Ok::<_, SyncError>((columns, sprint, tickets, transitions))
        }
        .await;

        let mut shared = lock(&self.shared);
        if shared.epoch != epoch {
            debug!(board_id = board.id, "discarding load for a board no longer selected");
            return Ok(Refresh::Stale);
        }
        shared.view.loading = false;
        match fetched {
            Ok((columns, sprint, tickets, transitions)) => {
                shared.view.columns = columns;
                apply_tickets(&mut shared.view, sprint, tickets, transitions);
                Ok(Refresh::Applied)
            }
            Err(e) => {
                drop(shared);
                error!(error = %e, board_id = board.id, "board load failed");
                self.notifications
                    .error("error-loading-board", format!("Error loading board {}: {e}", board.name));
                Err(e)
            }
        }
    }

    /// Re-fetch the active sprint and its tickets for the current board.
    ///
    /// Cached transitions are kept; they are fetched only while the cache is
    /// empty. Columns are likewise re-fetched only while none are loaded.
    pub async fn poll_tickets(&self) -> Result<Refresh> {
        let (board, epoch, revision, have_columns, have_transitions) = {
            let shared = lock(&self.shared);
            match &shared.view.board {
                Some(board) => (
                    board.clone(),
                    shared.epoch,
                    shared.revision,
                    !shared.view.columns.is_empty(),
                    !shared.view.transitions.is_empty(),
                ),
                None => return Ok(Refresh::NoBoard),
            }
        };

        let fetched = async {
            let columns = if have_columns {
                None
            } else {
                Some(self.client.board_columns(board.id, &board.profile).await?)
            };
            let (sprint, tickets) = self.fetch_sprint_tickets(&board).await?;
            let transitions = if have_transitions {
                Vec::new()
            } else {
                self.fetch_transitions(&board.profile, &tickets).await
            };
            Ok::<_, SyncError>((columns, sprint, tickets, transitions))
        }
        .await;

        let mut shared = lock(&self.shared);
        if shared.epoch != epoch || shared.revision != revision {
            debug!(board_id = board.id, "discarding stale ticket poll");
            return Ok(Refresh::Stale);
        }
        match fetched {
            Ok((columns, sprint, tickets, transitions)) => {
                if let Some(columns) = columns {
                    shared.view.columns = columns;
                }
                apply_tickets(&mut shared.view, sprint, tickets, transitions);
                Ok(Refresh::Applied)
            }
            Err(e) => {
                drop(shared);
                warn!(error = %e, board_id = board.id, "ticket poll failed");
                self.notifications.push_unique(
                    Notification::error(format!("Error getting tickets: {e}"))
                        .with_key("error-getting-tickets")
                        .with_ttl(self.notifications.ttl()),
                );
                Err(e)
            }
        }
    }

    async fn fetch_sprint_tickets(&self, board: &Board) -> Result<(Option<Sprint>, Vec<Ticket>)> {
        let sprint = self.client.active_sprint(board.id, &board.profile).await?;
        let tickets = match &sprint {
            Some(sprint) => self.client.sprint_tickets(sprint.id, &board.profile).await?,
            None => Vec::new(),
        };
        Ok((sprint, tickets))
    }

    /// Transitions of the first ticket, shared by the whole board. Failure
    /// leaves the cache empty; moves then report `TransitionsUnavailable`.
    async fn fetch_transitions(&self, profile: &Profile, tickets: &[Ticket]) -> Vec<Transition> {
        let Some(first) = tickets.first() else {
            return Vec::new();
        };
        match self.client.available_transitions(&first.id, profile).await {
            Ok(transitions) => transitions,
            Err(e) => {
                warn!(error = %e, ticket = %first.key, "could not fetch transitions");
                self.notifications.push_unique(
                    Notification::error(format!("Error getting transitions: {e}"))
                        .with_key("error-getting-transitions")
                        .with_ttl(self.notifications.ttl()),
                );
                Vec::new()
            }
        }
    }

    /// Move `ticket` into `destination` by applying the matching transition,
    /// then refresh tickets.
    pub async fn move_ticket(&self, ticket: &Ticket, destination: &Column) -> Result<MoveOutcome> {
        let Some(guard) = self.claim_move(&ticket.key) else {
            debug!(ticket = %ticket.key, "move already in flight");
            self.notifications.push_unique(
                Notification::warning(format!("{} is still moving", ticket.key))
                    .with_key(format!("busy-{}", ticket.key))
                    .with_ttl(self.notifications.ttl()),
            );
            return Ok(MoveOutcome::Busy);
        };

        let result = self.transition_ticket(ticket, destination).await;
        match &result {
            Ok(MoveOutcome::Moved { transition_id }) => {
                info!(ticket = %ticket.key, column = %destination.name, %transition_id, "ticket moved");
                lock(&self.shared).revision += 1;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, ticket = %ticket.key, column = %destination.name, "ticket move failed");
                let reason = match e {
                    SyncError::TransitionsUnavailable => " no transitions found".to_string(),
                    SyncError::NoMatchingTransition { .. } => " transition not found".to_string(),
                    other => format!(": {other}"),
                };
                self.notifications
                    .error("error-moving-ticket", format!("Error moving ticket {}{reason}", ticket.key));
            }
        }
        drop(guard);

        if matches!(result, Ok(MoveOutcome::Moved { .. })) {
            // Ticket status is only updated from the service, never locally.
            let _ = self.poll_tickets().await;
        }
        result
    }

    fn claim_move(&self, key: &str) -> Option<PendingMove<'_>> {
        let mut pending = lock(&self.pending_moves);
        if !pending.insert(key.to_string()) {
            return None;
        }
        Some(PendingMove {
            pending: &self.pending_moves,
            key: key.to_string(),
        })
    }

    async fn transition_ticket(&self, ticket: &Ticket, destination: &Column) -> Result<MoveOutcome> {
        let entry = destination.entry_status().ok_or_else(|| {
            SyncError::MalformedResponse(format!("column {} has no statuses", destination.name))
        })?;
        let (profile, transitions) = {
            let shared = lock(&self.shared);
            let board = shared
                .view
                .board
                .as_ref()
                .ok_or_else(|| SyncError::MalformedResponse("no board selected".to_string()))?;
            (board.profile.clone(), shared.view.transitions.clone())
        };

        let transition_id = match resolve(&ticket.status_id, entry, &transitions)? {
            Resolution::AlreadyInPlace => return Ok(MoveOutcome::AlreadyInPlace),
            Resolution::Apply(t) => t.id.clone(),
        };
        self.client
            .apply_transition(&ticket.id, &transition_id, &profile)
            .await?;
        Ok(MoveOutcome::Moved { transition_id })
    }

    /// Boards of every linked project, in link order.
    ///
    /// Stops at the first project whose boards cannot be listed and returns
    /// what was collected so far, so boards of earlier projects stay
    /// selectable.
    pub async fn discover_boards(&self, linked: &[LinkedProject]) -> Vec<Board> {
        let mut boards = Vec::new();
        for link in linked {
            match self.client.list_boards(&link.profile, &link.project_key).await {
                Ok(found) => boards.extend(found),
                Err(e) => {
                    error!(error = %e, project = %link.project_key, "listing boards failed");
                    self.notifications.error(
                        "error-getting-jira-boards",
                        format!("Error getting Jira boards for {}", link.project_key),
                    );
                    break;
                }
            }
        }
        boards
    }

    pub async fn identity(&self, profile: &Profile) -> Result<ProfileIdentity> {
        self.client.profile_identity(profile).await.inspect_err(|e| {
            self.notifications
                .error("error-getting-profile", format!("Error getting profile {}: {e}", profile.name));
        })
    }

    pub fn spawn_poll(self: &Arc<Self>, every: Duration) -> PollHandle {
        let engine = Arc::clone(self);
        spawn_poller("board", every, move |_| {
            let engine = Arc::clone(&engine);
            async move {
                let _ = engine.poll_tickets().await;
            }
        })
    }
}

fn apply_tickets(view: &mut BoardView, sprint: Option<Sprint>, tickets: Vec<Ticket>, transitions: Vec<Transition>) {
    let me = view.board.as_ref().map(|b| b.profile.email.clone());
    view.assignee_options = assignee_options(&tickets, me.as_deref());
    view.sprint = sprint;
    view.tickets = tickets;
    if !transitions.is_empty() {
        view.transitions = transitions;
    }
}
