use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A running or completed time entry, as returned by
/// `GET /api/v9/me/time_entries/current`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TimeEntry {
    pub id: i64,
    #[serde(default)]
    pub billable: bool,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub duration: i64,
    pub workspace_id: i64,
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Account snapshot from `GET /api/v9/me?with_related_data=true`. Only the
/// lookup tables are interesting here; the rest of the payload is ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccountMeta {
    pub id: i64,
    pub fullname: String,
    pub default_workspace_id: i64,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}
