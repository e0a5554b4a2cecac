use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{decode, send, IssueTracker};
use crate::error::{Result, Service};
use crate::model::board::{Board, Column, IssueProject, Profile, ProfileIdentity, Sprint, Ticket, Transition};

const PAGE_SIZE: u32 = 100;
/// Rank used when a ticket carries no priority ("Medium").
const DEFAULT_PRIORITY_RANK: u8 = 3;

pub struct JiraClient {
    client: reqwest::Client,
}

impl Default for JiraClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JiraClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn get(&self, profile: &Profile, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, profile, path)
    }

    fn request(&self, method: reqwest::Method, profile: &Profile, path: &str) -> reqwest::RequestBuilder {
        let creds = format!("{}:{}", profile.email, profile.token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        self.client
            .request(method, format!("{}{path}", profile.url.trim_end_matches('/')))
            .header("Authorization", format!("Basic {encoded}"))
            .header("Accept", "application/json")
    }
}

#[derive(Deserialize)]
struct JiraProject {
    id: String,
    key: String,
    name: String,
}

#[derive(Deserialize)]
struct Paged<T> {
    values: Vec<T>,
}

#[derive(Deserialize)]
struct JiraBoard {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardConfiguration {
    column_config: ColumnConfig,
}

#[derive(Deserialize)]
struct ColumnConfig {
    columns: Vec<JiraColumn>,
}

#[derive(Deserialize)]
struct JiraColumn {
    name: String,
    #[serde(default)]
    statuses: Vec<IdField>,
}

#[derive(Deserialize)]
struct IdField {
    id: String,
}

#[derive(Deserialize)]
struct JiraSprint {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuePage {
    issues: Vec<JiraIssue>,
    #[serde(default)]
    start_at: u32,
    total: Option<u32>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: Option<String>,
    status: IdField,
    assignee: Option<UserField>,
    priority: Option<IdField>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserField {
    email_address: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct TransitionList {
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    #[serde(default)]
    name: String,
    to: IdField,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    account_id: String,
    display_name: String,
    #[serde(default)]
    avatar_urls: std::collections::HashMap<String, String>,
}

impl JiraIssue {
    fn into_ticket(self) -> Ticket {
        let (assignee_email, assignee_name) = match self.fields.assignee {
            Some(user) => (user.email_address, user.display_name),
            None => (None, None),
        };
        Ticket {
            id: self.id,
            key: self.key,
            status_id: self.fields.status.id,
            assignee_email,
            assignee_name,
            priority_rank: self
                .fields
                .priority
                .and_then(|p| p.id.parse().ok())
                .unwrap_or(DEFAULT_PRIORITY_RANK),
            summary: self.fields.summary.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn list_projects(&self, profile: &Profile) -> Result<Vec<IssueProject>> {
        let resp = send(Service::IssueTracking, self.get(profile, "/rest/api/3/project")).await?;
        let projects: Vec<JiraProject> = decode(Service::IssueTracking, resp).await?;
        Ok(projects
            .into_iter()
            .map(|p| IssueProject {
                id: p.id,
                key: p.key,
                name: p.name,
            })
            .collect())
    }

    async fn list_boards(&self, profile: &Profile, project_key: &str) -> Result<Vec<Board>> {
        let resp = send(
            Service::IssueTracking,
            self.get(profile, "/rest/agile/1.0/board")
                .query(&[("projectKeyOrId", project_key)]),
        )
        .await?;
        let page: Paged<JiraBoard> = decode(Service::IssueTracking, resp).await?;
        Ok(page
            .values
            .into_iter()
            .map(|b| Board {
                id: b.id,
                name: b.name,
                profile: profile.clone(),
            })
            .collect())
    }

    async fn board_columns(&self, board_id: u64, profile: &Profile) -> Result<Vec<Column>> {
        let resp = send(
            Service::IssueTracking,
            self.get(profile, &format!("/rest/agile/1.0/board/{board_id}/configuration")),
        )
        .await?;
        let config: BoardConfiguration = decode(Service::IssueTracking, resp).await?;
        let columns = config
            .column_config
            .columns
            .into_iter()
            .filter(|c| {
                if c.statuses.is_empty() {
                    debug!(board_id, column = %c.name, "skipping column without statuses");
                }
                !c.statuses.is_empty()
            })
            .map(|c| Column {
                name: c.name,
                status_ids: c.statuses.into_iter().map(|s| s.id).collect(),
            })
            .collect();
        Ok(columns)
    }

    async fn active_sprint(&self, board_id: u64, profile: &Profile) -> Result<Option<Sprint>> {
        let resp = send(
            Service::IssueTracking,
            self.get(profile, &format!("/rest/agile/1.0/board/{board_id}/sprint"))
                .query(&[("state", "active")]),
        )
        .await?;
        let page: Paged<JiraSprint> = decode(Service::IssueTracking, resp).await?;
        Ok(page.values.into_iter().next().map(|s| Sprint {
            id: s.id,
            name: s.name,
        }))
    }

    async fn sprint_tickets(&self, sprint_id: u64, profile: &Profile) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::new();
        let mut start_at = 0u32;
        loop {
            let resp = send(
                Service::IssueTracking,
                self.get(profile, &format!("/rest/agile/1.0/sprint/{sprint_id}/issue"))
                    .query(&[
                        ("startAt", start_at.to_string()),
                        ("maxResults", PAGE_SIZE.to_string()),
                        ("fields", "summary,status,assignee,priority".to_string()),
                    ]),
            )
            .await?;
            let page: IssuePage = decode(Service::IssueTracking, resp).await?;
            let fetched = page.issues.len() as u32;
            tickets.extend(page.issues.into_iter().map(JiraIssue::into_ticket));
            start_at = page.start_at + fetched;
            match page.total {
                Some(total) if fetched > 0 && start_at < total => continue,
                _ => break,
            }
        }
        debug!(sprint_id, count = tickets.len(), "loaded sprint tickets");
        Ok(tickets)
    }

    async fn available_transitions(&self, ticket_id: &str, profile: &Profile) -> Result<Vec<Transition>> {
        let path = format!(
            "/rest/api/3/issue/{}/transitions",
            urlencoding::encode(ticket_id)
        );
        let resp = send(Service::IssueTracking, self.get(profile, &path)).await?;
        let list: TransitionList = decode(Service::IssueTracking, resp).await?;
        Ok(list
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
                to_status_id: t.to.id,
            })
            .collect())
    }

    async fn apply_transition(&self, ticket_id: &str, transition_id: &str, profile: &Profile) -> Result<()> {
        let path = format!(
            "/rest/api/3/issue/{}/transitions",
            urlencoding::encode(ticket_id)
        );
        send(
            Service::IssueTracking,
            self.request(reqwest::Method::POST, profile, &path)
                .json(&json!({ "transition": { "id": transition_id } })),
        )
        .await?;
        Ok(())
    }

    async fn profile_identity(&self, profile: &Profile) -> Result<ProfileIdentity> {
        let resp = send(Service::IssueTracking, self.get(profile, "/rest/api/3/myself")).await?;
        let mut me: Myself = decode(Service::IssueTracking, resp).await?;
        Ok(ProfileIdentity {
            account_id: me.account_id,
            display_name: me.display_name,
            avatar_url: me.avatar_urls.remove("48x48"),
        })
    }
}
