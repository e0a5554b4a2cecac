use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::board::{LinkedProject, Profile};
use crate::model::timer::TaskRef;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub harvest: Option<HarvestConfig>,
    #[serde(default)]
    pub jira_profiles: Vec<Profile>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    /// `"<board name>-<board id>"` → column name → time-tracking task id.
    #[serde(default)]
    pub board_tasks: HashMap<String, HashMap<String, u64>>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Deserialize)]
pub struct HarvestConfig {
    pub token: String,
    pub account_id: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Links a time-tracking project to a project on one issue-tracking profile.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub harvest_project_id: u64,
    pub profile: String,
    pub jira_project: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub timer_secs: u64,
    pub board_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timer_secs: crate::timer::POLL_INTERVAL.as_secs(),
            board_secs: crate::board::POLL_INTERVAL.as_secs(),
        }
    }
}

impl PollingConfig {
    pub fn timer_interval(&self) -> Duration {
        Duration::from_secs(self.timer_secs.max(1))
    }

    pub fn board_interval(&self) -> Duration {
        Duration::from_secs(self.board_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub ttl_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: crate::notifications::DEFAULT_TTL.as_millis() as u64,
        }
    }
}

/// Shortest lifetime a notification can be configured with.
const MIN_TTL_MS: u64 = 500;

impl NotificationsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.max(MIN_TTL_MS))
    }
}

impl AppConfig {
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.jira_profiles.iter().find(|p| p.name == name)
    }

    /// Issue-tracking projects linked to a time-tracking project. Links
    /// naming an unknown profile are skipped.
    pub fn linked_projects(&self, harvest_project_id: u64) -> Vec<LinkedProject> {
        self.links
            .iter()
            .filter(|l| l.harvest_project_id == harvest_project_id)
            .filter_map(|l| {
                let Some(profile) = self.profile(&l.profile) else {
                    tracing::warn!(profile = %l.profile, project = %l.jira_project, "link names unknown profile");
                    return None;
                };
                Some(LinkedProject {
                    profile: profile.clone(),
                    project_key: l.jira_project.clone(),
                })
            })
            .collect()
    }

    /// Every linked project, paired with the time-tracking project it belongs to.
    pub fn all_linked_projects(&self) -> Vec<(u64, LinkedProject)> {
        let mut ids: Vec<u64> = Vec::new();
        for link in &self.links {
            if !ids.contains(&link.harvest_project_id) {
                ids.push(link.harvest_project_id);
            }
        }
        ids.into_iter()
            .flat_map(|id| self.linked_projects(id).into_iter().map(move |p| (id, p)))
            .collect()
    }

    /// Time-tracking task linked to `column` on the board keyed `board_key`.
    pub fn linked_task(&self, harvest_project_id: u64, board_key: &str, column: &str) -> Option<TaskRef> {
        let task_id = *self.board_tasks.get(board_key)?.get(column)?;
        Some(TaskRef {
            project_id: harvest_project_id,
            task_id,
        })
    }
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".timeboard")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}
