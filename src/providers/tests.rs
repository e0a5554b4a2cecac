//! In-memory providers that record calls, shared by the controller and
//! engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use super::{CreatedEntry, IssueTracker, TimeTracker, Unconfigured};
use crate::error::{Result, Service, SyncError};
use crate::model::board::{Board, Column, IssueProject, Profile, ProfileIdentity, Sprint, Ticket, Transition};
use crate::model::timer::{ExternalTask, RunningTimerEntry, TaskRef};

fn rejected(service: Service) -> SyncError {
    SyncError::Network {
        service,
        status: 500,
    }
}

/// Named semaphores a test closes to hold calls in flight.
#[derive(Default)]
struct Gates(Mutex<HashMap<String, Arc<Semaphore>>>);

impl Gates {
    fn close(&self, name: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(Semaphore::new(0)));
    }

    fn open(&self, name: &str) {
        if let Some(gate) = self.0.lock().unwrap().get(name) {
            gate.add_permits(1);
        }
    }

    async fn pass(&self, name: &str) {
        let gate = self.0.lock().unwrap().get(name).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeCall {
    Start(TaskRef, Option<String>),
    Stop(u64),
}

/// Time tracker whose server side is a list of running entries.
///
/// `"create"` and `"running"` can be gated to hold those calls in flight.
pub struct MockTimeTracker {
    calls: Mutex<Vec<TimeCall>>,
    server: Mutex<Vec<RunningTimerEntry>>,
    next_id: AtomicU64,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    running_requests: AtomicU64,
    gates: Gates,
}

impl MockTimeTracker {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            server: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            fail_start: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            running_requests: AtomicU64::new(0),
            gates: Gates::default(),
        }
    }

    pub fn gate(&self, name: &str) {
        self.gates.close(name);
    }

    pub fn release(&self, name: &str) {
        self.gates.open(name);
    }

    /// Running-entry requests issued so far, including held ones.
    pub fn running_requests(&self) -> u64 {
        self.running_requests.load(Ordering::SeqCst)
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn running_ids(&self) -> Vec<u64> {
        self.server
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.time_entry_id)
            .collect()
    }

    /// Replace what the server reports as running.
    pub fn set_running(&self, entry: Option<RunningTimerEntry>) {
        *self.server.lock().unwrap() = entry.into_iter().collect();
    }
}

#[async_trait]
impl TimeTracker for MockTimeTracker {
    async fn list_assigned_tasks(&self) -> Result<Vec<ExternalTask>> {
        Ok(vec![ExternalTask {
            project_id: 1,
            project_name: "Client Work".into(),
            task_id: 1,
            task_name: "Development".into(),
        }])
    }

    async fn create_time_entry(&self, target: TaskRef, note: Option<&str>) -> Result<CreatedEntry> {
        self.calls
            .lock()
            .unwrap()
            .push(TimeCall::Start(target, note.map(String::from)));
        self.gates.pass("create").await;
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(rejected(Service::TimeTracking));
        }
        let created = CreatedEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            started_at: Utc::now(),
        };
        self.server.lock().unwrap().push(RunningTimerEntry {
            project_id: target.project_id,
            task_id: target.task_id,
            time_entry_id: created.id,
            started_at: created.started_at,
            note: note.map(String::from),
        });
        Ok(created)
    }

    async fn stop_time_entry(&self, entry_id: u64) -> Result<()> {
        self.calls.lock().unwrap().push(TimeCall::Stop(entry_id));
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(rejected(Service::TimeTracking));
        }
        self.server
            .lock()
            .unwrap()
            .retain(|e| e.time_entry_id != entry_id);
        Ok(())
    }

    async fn running_time_entry(&self) -> Result<Option<RunningTimerEntry>> {
        // Read before the gate so a held call returns what the server had when asked.
        let running = self.server.lock().unwrap().first().cloned();
        self.running_requests.fetch_add(1, Ordering::SeqCst);
        self.gates.pass("running").await;
        Ok(running)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoardFixture {
    pub columns: Vec<Column>,
    pub sprint: Option<Sprint>,
}

/// Issue tracker backed by per-board fixtures.
///
/// Calls named in `gates` (e.g. `"columns:1"`, `"apply:10001"`) block until
/// the test releases them with [`MockIssueTracker::release`].
#[derive(Default)]
pub struct MockIssueTracker {
    pub boards: Mutex<HashMap<u64, BoardFixture>>,
    pub tickets: Mutex<HashMap<u64, Vec<Ticket>>>,
    pub transitions: Mutex<Vec<Transition>>,
    pub board_list: Mutex<HashMap<String, Vec<(u64, String)>>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    gates: Gates,
}

impl MockIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Make the call named `name` fail until cleared.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().push(name.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn gate(&self, name: &str) {
        self.gates.close(name);
    }

    pub fn release(&self, name: &str) {
        self.gates.open(name);
    }

    pub fn set_tickets(&self, sprint_id: u64, tickets: Vec<Ticket>) {
        self.tickets.lock().unwrap().insert(sprint_id, tickets);
    }

    /// Record `name`, wait on its gate if any, then fail if marked failing.
    async fn enter(&self, name: String) -> Result<()> {
        self.calls.lock().unwrap().push(name.clone());
        self.gates.pass(&name).await;
        if self.failing.lock().unwrap().contains(&name) {
            return Err(rejected(Service::IssueTracking));
        }
        Ok(())
    }

    fn fixture(&self, board_id: u64) -> BoardFixture {
        self.boards
            .lock()
            .unwrap()
            .get(&board_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IssueTracker for MockIssueTracker {
    async fn list_projects(&self, _profile: &Profile) -> Result<Vec<IssueProject>> {
        self.enter("projects".into()).await?;
        Ok(Vec::new())
    }

    async fn list_boards(&self, profile: &Profile, project_key: &str) -> Result<Vec<Board>> {
        self.enter(format!("boards:{project_key}")).await?;
        let list = self
            .board_list
            .lock()
            .unwrap()
            .get(project_key)
            .cloned()
            .unwrap_or_default();
        Ok(list
            .into_iter()
            .map(|(id, name)| Board {
                id,
                name,
                profile: profile.clone(),
            })
            .collect())
    }

    async fn board_columns(&self, board_id: u64, _profile: &Profile) -> Result<Vec<Column>> {
        self.enter(format!("columns:{board_id}")).await?;
        Ok(self.fixture(board_id).columns)
    }

    async fn active_sprint(&self, board_id: u64, _profile: &Profile) -> Result<Option<Sprint>> {
        self.enter(format!("sprint:{board_id}")).await?;
        Ok(self.fixture(board_id).sprint)
    }

    async fn sprint_tickets(&self, sprint_id: u64, _profile: &Profile) -> Result<Vec<Ticket>> {
        // Read before the gate so a held call returns what the server had when asked.
        let tickets = self
            .tickets
            .lock()
            .unwrap()
            .get(&sprint_id)
            .cloned()
            .unwrap_or_default();
        self.enter(format!("tickets:{sprint_id}")).await?;
        Ok(tickets)
    }

    async fn available_transitions(&self, ticket_id: &str, _profile: &Profile) -> Result<Vec<Transition>> {
        self.enter(format!("transitions:{ticket_id}")).await?;
        Ok(self.transitions.lock().unwrap().clone())
    }

    async fn apply_transition(&self, ticket_id: &str, transition_id: &str, _profile: &Profile) -> Result<()> {
        self.enter(format!("apply:{ticket_id}")).await?;
        // Mirror the workflow: the ticket lands in the transition's target status.
        let to = self
            .transitions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == transition_id)
            .map(|t| t.to_status_id.clone());
        if let Some(to) = to {
            for tickets in self.tickets.lock().unwrap().values_mut() {
                for ticket in tickets.iter_mut().filter(|t| t.id == ticket_id) {
                    ticket.status_id = to.clone();
                }
            }
        }
        Ok(())
    }

    async fn profile_identity(&self, profile: &Profile) -> Result<ProfileIdentity> {
        self.enter("myself".into()).await?;
        Ok(ProfileIdentity {
            account_id: format!("acc-{}", profile.name),
            display_name: profile.email.clone(),
            avatar_url: None,
        })
    }
}

#[tokio::test]
async fn unconfigured_tracker_is_idle() {
    let tracker = Unconfigured;
    assert!(tracker.list_assigned_tasks().await.unwrap().is_empty());
    assert!(tracker.running_time_entry().await.unwrap().is_none());
    assert!(matches!(
        tracker
            .create_time_entry(TaskRef { project_id: 1, task_id: 1 }, None)
            .await,
        Err(SyncError::NotConfigured(Service::TimeTracking))
    ));
}

#[tokio::test]
async fn mock_time_tracker_tracks_server_entries() {
    let tracker = MockTimeTracker::new();
    let target = TaskRef { project_id: 1, task_id: 2 };
    let created = tracker.create_time_entry(target, Some("note")).await.unwrap();
    assert_eq!(tracker.running_ids(), vec![created.id]);

    tracker.stop_time_entry(created.id).await.unwrap();
    assert!(tracker.running_ids().is_empty());
    assert_eq!(
        tracker.calls(),
        vec![
            TimeCall::Start(target, Some("note".into())),
            TimeCall::Stop(created.id)
        ]
    );
}

#[tokio::test]
async fn mock_issue_tracker_failure_is_network_error() {
    let tracker = MockIssueTracker::new();
    tracker.fail("columns:9");
    let profile = Profile {
        name: "work".into(),
        url: "http://localhost".into(),
        email: "me@x.com".into(),
        token: "t".into(),
    };
    let err = tracker.board_columns(9, &profile).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Network {
            service: Service::IssueTracking,
            status: 500
        }
    ));
    assert_eq!(tracker.calls(), vec!["columns:9"]);
}
