pub mod harvest;
pub mod jira;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::{Result, Service, SyncError};
use crate::model::board::{Board, Column, IssueProject, Profile, ProfileIdentity, Sprint, Ticket, Transition};
use crate::model::timer::{ExternalTask, RunningTimerEntry, TaskRef};

/// What the time-tracking service reports for a freshly started timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntry {
    pub id: u64,
    pub started_at: DateTime<Utc>,
}

#[async_trait]
pub trait TimeTracker: Send + Sync {
    async fn list_assigned_tasks(&self) -> Result<Vec<ExternalTask>>;
    async fn create_time_entry(&self, target: TaskRef, note: Option<&str>) -> Result<CreatedEntry>;
    async fn stop_time_entry(&self, entry_id: u64) -> Result<()>;
    /// The entry currently running server-side, if any.
    async fn running_time_entry(&self) -> Result<Option<RunningTimerEntry>>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_projects(&self, profile: &Profile) -> Result<Vec<IssueProject>>;
    async fn list_boards(&self, profile: &Profile, project_key: &str) -> Result<Vec<Board>>;
    async fn board_columns(&self, board_id: u64, profile: &Profile) -> Result<Vec<Column>>;
    async fn active_sprint(&self, board_id: u64, profile: &Profile) -> Result<Option<Sprint>>;
    async fn sprint_tickets(&self, sprint_id: u64, profile: &Profile) -> Result<Vec<Ticket>>;
    /// Transitions available from `ticket_id`; reused for every ticket on the board.
    async fn available_transitions(&self, ticket_id: &str, profile: &Profile) -> Result<Vec<Transition>>;
    async fn apply_transition(&self, ticket_id: &str, transition_id: &str, profile: &Profile) -> Result<()>;
    async fn profile_identity(&self, profile: &Profile) -> Result<ProfileIdentity>;
}

/// Time tracker used when no Harvest credentials are configured.
pub struct Unconfigured;

#[async_trait]
impl TimeTracker for Unconfigured {
    async fn list_assigned_tasks(&self) -> Result<Vec<ExternalTask>> {
        Ok(Vec::new())
    }

    async fn create_time_entry(&self, _target: TaskRef, _note: Option<&str>) -> Result<CreatedEntry> {
        Err(SyncError::NotConfigured(Service::TimeTracking))
    }

    async fn stop_time_entry(&self, _entry_id: u64) -> Result<()> {
        Err(SyncError::NotConfigured(Service::TimeTracking))
    }

    async fn running_time_entry(&self) -> Result<Option<RunningTimerEntry>> {
        Ok(None)
    }
}

pub fn create_time_tracker(config: &AppConfig) -> Arc<dyn TimeTracker> {
    match &config.harvest {
        Some(cfg) => Arc::new(harvest::HarvestClient::new(
            cfg.base_url.clone(),
            cfg.token.clone(),
            cfg.account_id.clone(),
        )),
        None => Arc::new(Unconfigured),
    }
}

pub fn create_issue_tracker() -> Arc<dyn IssueTracker> {
    Arc::new(jira::JiraClient::new())
}

/// Send a request and map transport errors and non-2xx statuses.
pub(crate) async fn send(
    service: Service,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let resp = request
        .send()
        .await
        .map_err(|source| SyncError::Transport { service, source })?;
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!(%service, status = status.as_u16(), url = %resp.url(), "request rejected");
        return Err(SyncError::Network {
            service,
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

/// Decode a JSON body, reporting missing or mistyped fields as malformed.
pub(crate) async fn decode<T: DeserializeOwned>(service: Service, resp: reqwest::Response) -> Result<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|source| SyncError::Transport { service, source })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SyncError::MalformedResponse(format!("{service}: {e}")))
}

#[cfg(test)]
pub mod tests;
