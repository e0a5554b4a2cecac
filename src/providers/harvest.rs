use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode, send, CreatedEntry, TimeTracker};
use crate::error::{Result, Service, SyncError};
use crate::model::timer::{ExternalTask, RunningTimerEntry, TaskRef};

pub const DEFAULT_BASE_URL: &str = "https://api.harvestapp.com/v2";

pub struct HarvestClient {
    base_url: String,
    token: String,
    account_id: String,
    client: reqwest::Client,
}

impl HarvestClient {
    pub fn new(base_url: Option<String>, token: String, account_id: String) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            base_url,
            token,
            account_id,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Harvest-Account-ID", &self.account_id)
            .header("User-Agent", "timeboard")
            .header("Accept", "application/json")
    }
}

#[derive(Deserialize)]
struct AssignmentsPage {
    project_assignments: Vec<ProjectAssignment>,
    next_page: Option<u32>,
}

#[derive(Deserialize)]
struct ProjectAssignment {
    project: NamedRef,
    #[serde(default)]
    task_assignments: Vec<TaskAssignment>,
}

#[derive(Deserialize)]
struct TaskAssignment {
    task: NamedRef,
}

#[derive(Deserialize)]
struct NamedRef {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct IdRef {
    id: u64,
}

#[derive(Deserialize)]
struct TimeEntry {
    id: u64,
    project: IdRef,
    task: IdRef,
    timer_started_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl TimeEntry {
    fn into_running(self) -> Result<RunningTimerEntry> {
        let started_at = self.timer_started_at.ok_or_else(|| {
            SyncError::MalformedResponse(format!("time entry {} has no timer_started_at", self.id))
        })?;
        Ok(RunningTimerEntry {
            project_id: self.project.id,
            task_id: self.task.id,
            time_entry_id: self.id,
            started_at,
            note: self.notes.filter(|n| !n.is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct TimeEntries {
    time_entries: Vec<TimeEntry>,
}

#[derive(Serialize)]
struct NewTimeEntry<'a> {
    project_id: u64,
    task_id: u64,
    spent_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[async_trait]
impl TimeTracker for HarvestClient {
    async fn list_assigned_tasks(&self) -> Result<Vec<ExternalTask>> {
        let mut tasks = Vec::new();
        let mut page = 1u32;
        loop {
            let resp = send(
                Service::TimeTracking,
                self.request(reqwest::Method::GET, "/users/me/project_assignments")
                    .query(&[("page", page)]),
            )
            .await?;
            let body: AssignmentsPage = decode(Service::TimeTracking, resp).await?;
            for assignment in body.project_assignments {
                for ta in assignment.task_assignments {
                    tasks.push(ExternalTask {
                        project_id: assignment.project.id,
                        project_name: assignment.project.name.clone(),
                        task_id: ta.task.id,
                        task_name: ta.task.name,
                    });
                }
            }
            match body.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        debug!(count = tasks.len(), "loaded assigned tasks");
        Ok(tasks)
    }

    async fn create_time_entry(&self, target: TaskRef, note: Option<&str>) -> Result<CreatedEntry> {
        let body = NewTimeEntry {
            project_id: target.project_id,
            task_id: target.task_id,
            spent_date: chrono::Local::now().date_naive().to_string(),
            notes: note,
        };
        let resp = send(
            Service::TimeTracking,
            self.request(reqwest::Method::POST, "/time_entries").json(&body),
        )
        .await?;
        let entry: TimeEntry = decode(Service::TimeTracking, resp).await?;
        let running = entry.into_running()?;
        Ok(CreatedEntry {
            id: running.time_entry_id,
            started_at: running.started_at,
        })
    }

    async fn stop_time_entry(&self, entry_id: u64) -> Result<()> {
        send(
            Service::TimeTracking,
            self.request(reqwest::Method::PATCH, &format!("/time_entries/{entry_id}/stop")),
        )
        .await?;
        Ok(())
    }

    async fn running_time_entry(&self) -> Result<Option<RunningTimerEntry>> {
        let resp = send(
            Service::TimeTracking,
            self.request(reqwest::Method::GET, "/time_entries")
                .query(&[("is_running", "true")]),
        )
        .await?;
        let body: TimeEntries = decode(Service::TimeTracking, resp).await?;
        body.time_entries
            .into_iter()
            .next()
            .map(TimeEntry::into_running)
            .transpose()
    }
}
