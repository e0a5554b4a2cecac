use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A billable task assignment in the time-tracking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTask {
    pub project_id: u64,
    pub project_name: String,
    pub task_id: u64,
    pub task_name: String,
}

impl ExternalTask {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            project_id: self.project_id,
            task_id: self.task_id,
        }
    }
}

/// Identity of a task a timer can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub project_id: u64,
    pub task_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTimerEntry {
    pub project_id: u64,
    pub task_id: u64,
    pub time_entry_id: u64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RunningTimerEntry {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            project_id: self.project_id,
            task_id: self.task_id,
        }
    }

    pub fn is_for(&self, target: TaskRef) -> bool {
        self.task_ref() == target
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Running(RunningTimerEntry),
}

impl TimerState {
    pub fn running(&self) -> Option<&RunningTimerEntry> {
        match self {
            TimerState::Idle => None,
            TimerState::Running(entry) => Some(entry),
        }
    }

    pub fn is_running_for(&self, target: TaskRef) -> bool {
        self.running().is_some_and(|e| e.is_for(target))
    }
}

impl From<Option<RunningTimerEntry>> for TimerState {
    fn from(entry: Option<RunningTimerEntry>) -> Self {
        entry.map_or(TimerState::Idle, TimerState::Running)
    }
}

/// Render elapsed seconds as `M:SS`, or `H:MM:SS` from one hour on.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}
