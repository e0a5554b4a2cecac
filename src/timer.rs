//! Single running timer, kept in step with the time-tracking service.
//!
//! [`TimerController`] owns the only [`TimerState`] in the process. User
//! toggles and the periodic poll both go through one async mutex, and a
//! version counter lets the poll discard a snapshot that was requested
//! before a toggle finished.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::model::board::Ticket;
use crate::model::notification::Notification;
use crate::model::timer::{ExternalTask, RunningTimerEntry, TaskRef, TimerState};
use crate::notifications::NotificationQueue;
use crate::poll::{spawn_poller, PollHandle};
use crate::providers::TimeTracker;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A request to start or stop the timer on `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleCommand {
    pub target: TaskRef,
    pub note: Option<String>,
    /// Issued from a board ticket rather than a plain task click.
    pub workflow_ticket: bool,
}

impl ToggleCommand {
    pub fn task(target: TaskRef) -> Self {
        Self {
            target,
            note: None,
            workflow_ticket: false,
        }
    }

    pub fn with_note(target: TaskRef, note: &str) -> Self {
        let note = note.trim();
        Self {
            target,
            note: (!note.is_empty()).then(|| note.to_string()),
            workflow_ticket: false,
        }
    }

    /// Timer on a linked task, noted with the ticket it was started from.
    pub fn ticket(target: TaskRef, ticket: &Ticket) -> Self {
        Self {
            target,
            note: Some(format!("{}: {}", ticket.key, ticket.summary)),
            workflow_ticket: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePlan {
    Start,
    Stop,
    StopThenStart,
}

/// Decide what a toggle does given the currently running entry.
pub fn plan_toggle(current: Option<&RunningTimerEntry>, cmd: &ToggleCommand) -> TogglePlan {
    match current {
        None => TogglePlan::Start,
        Some(entry) if entry.is_for(cmd.target) => {
            if cmd.note.is_none() && !cmd.workflow_ticket {
                TogglePlan::Stop
            } else if cmd.workflow_ticket && entry.note == cmd.note {
                TogglePlan::Stop
            } else {
                TogglePlan::StopThenStart
            }
        }
        Some(_) => TogglePlan::StopThenStart,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started(RunningTimerEntry),
    Stopped(RunningTimerEntry),
    Switched {
        stopped: RunningTimerEntry,
        started: RunningTimerEntry,
    },
}

/// Version observed when a poll was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket(u64);

pub struct TimerController {
    client: Arc<dyn TimeTracker>,
    notifications: NotificationQueue,
    state: Mutex<TimerState>,
    version: AtomicU64,
    published: watch::Sender<TimerState>,
}

impl TimerController {
    pub fn new(client: Arc<dyn TimeTracker>, notifications: NotificationQueue) -> Self {
        let (published, _) = watch::channel(TimerState::Idle);
        Self {
            client,
            notifications,
            state: Mutex::new(TimerState::Idle),
            version: AtomicU64::new(0),
            published,
        }
    }

    /// Last settled state. Never blocks on an in-flight toggle.
    pub fn snapshot(&self) -> TimerState {
        self.published.borrow().clone()
    }

    pub async fn toggle(&self, cmd: ToggleCommand) -> Result<ToggleOutcome> {
        let mut state = self.state.lock().await;
        self.version.fetch_add(1, Ordering::SeqCst);
        let result = self.apply_toggle(&mut state, &cmd).await;
        self.version.fetch_add(1, Ordering::SeqCst);
        self.publish(&state);
        drop(state);

        match &result {
            Ok(outcome) => info!(?outcome, "timer toggled"),
            Err(e) => {
                error!(error = %e, target = ?cmd.target, "timer toggle failed");
                self.notifications
                    .error("error-toggling-timer", format!("Error updating timer: {e}"));
            }
        }
        result
    }

    async fn apply_toggle(&self, state: &mut TimerState, cmd: &ToggleCommand) -> Result<ToggleOutcome> {
        let plan = plan_toggle(state.running(), cmd);
        debug!(?plan, target = ?cmd.target, "toggle planned");
        match (plan, state.running().cloned()) {
            (TogglePlan::Stop, Some(running)) => {
                self.client.stop_time_entry(running.time_entry_id).await?;
                *state = TimerState::Idle;
                Ok(ToggleOutcome::Stopped(running))
            }
            (TogglePlan::StopThenStart, Some(running)) => {
                self.client.stop_time_entry(running.time_entry_id).await?;
                // The old entry is stopped server-side whatever happens next.
                *state = TimerState::Idle;
                let started = self.start(cmd).await?;
                *state = TimerState::Running(started.clone());
                Ok(ToggleOutcome::Switched {
                    stopped: running,
                    started,
                })
            }
            _ => {
                let started = self.start(cmd).await?;
                *state = TimerState::Running(started.clone());
                Ok(ToggleOutcome::Started(started))
            }
        }
    }

    async fn start(&self, cmd: &ToggleCommand) -> Result<RunningTimerEntry> {
        let created = self
            .client
            .create_time_entry(cmd.target, cmd.note.as_deref())
            .await?;
        Ok(RunningTimerEntry {
            project_id: cmd.target.project_id,
            task_id: cmd.target.task_id,
            time_entry_id: created.id,
            started_at: created.started_at,
            note: cmd.note.clone(),
        })
    }

    /// Adopt `snapshot` as the truth: `None` forces idle.
    pub async fn reconcile(&self, snapshot: Option<RunningTimerEntry>) {
        let mut state = self.state.lock().await;
        self.adopt(&mut state, snapshot);
    }

    pub fn begin_poll(&self) -> PollTicket {
        PollTicket(self.version.load(Ordering::SeqCst))
    }

    /// Reconcile unless a toggle started or finished since `ticket` was taken.
    pub async fn reconcile_if_current(&self, ticket: PollTicket, snapshot: Option<RunningTimerEntry>) -> bool {
        let mut state = self.state.lock().await;
        if self.version.load(Ordering::SeqCst) != ticket.0 {
            debug!("discarding stale running-timer snapshot");
            return false;
        }
        self.adopt(&mut state, snapshot);
        true
    }

    fn adopt(&self, state: &mut TimerState, snapshot: Option<RunningTimerEntry>) {
        let next = TimerState::from(snapshot);
        if *state != next {
            info!(from = ?state.running().map(|e| e.time_entry_id), to = ?next.running().map(|e| e.time_entry_id), "timer reconciled");
            *state = next;
        }
        self.publish(state);
    }

    /// Fetch the running entry and reconcile against it.
    pub async fn poll_once(&self) -> Result<bool> {
        let ticket = self.begin_poll();
        let snapshot = self.client.running_time_entry().await?;
        Ok(self.reconcile_if_current(ticket, snapshot).await)
    }

    pub fn spawn_poll(self: &Arc<Self>, every: Duration) -> PollHandle {
        let controller = Arc::clone(self);
        spawn_poller("timer", every, move |_| {
            let controller = Arc::clone(&controller);
            async move {
                if let Err(e) = controller.poll_once().await {
                    debug!(error = %e, "timer poll failed");
                    controller.notifications.push_unique(
                        Notification::error(format!("Error polling timer: {e}"))
                            .with_key("error-polling-timer")
                            .with_ttl(controller.notifications.ttl()),
                    );
                }
            }
        })
    }

    pub async fn assigned_tasks(&self) -> Result<Vec<ExternalTask>> {
        self.client.list_assigned_tasks().await.inspect_err(|e| {
            error!(error = %e, "loading assigned tasks failed");
            self.notifications
                .error("error-getting-tasks", format!("Error getting tasks: {e}"));
        })
    }

    fn publish(&self, state: &TimerState) {
        self.published.send_replace(state.clone());
    }
}
