use serde::{Deserialize, Serialize};

/// Credentials scoping calls to one issue-tracking instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub url: String,
    pub email: String,
    pub token: String,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub account_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueProject {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// An issue-tracking project linked to a time-tracking project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProject {
    pub profile: Profile,
    pub project_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: u64,
    pub name: String,
    pub profile: Profile,
}

impl Board {
    /// Key used by the per-board task mapping, `"<name>-<id>"`.
    pub fn mapping_key(&self) -> String {
        format!("{}-{}", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Never empty once loaded; the first status is the column's entry status.
    pub status_ids: Vec<String>,
}

impl Column {
    pub fn entry_status(&self) -> Option<&str> {
        self.status_ids.first().map(String::as_str)
    }

    pub fn holds(&self, status_id: &str) -> bool {
        self.status_ids.iter().any(|s| s == status_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Issue id used for API calls.
    pub id: String,
    pub key: String,
    pub status_id: String,
    pub assignee_email: Option<String>,
    pub assignee_name: Option<String>,
    pub priority_rank: u8,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to_status_id: String,
}
