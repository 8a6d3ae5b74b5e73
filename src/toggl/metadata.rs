use chrono::{DateTime, Utc};

use super::models::AccountMeta;

/// How long a fetched snapshot is considered fresh.
const REFRESH_INTERVAL_SECS: i64 = 10 * 60;

/// Time-boxed cache of the account's project/task lookup tables. Stale data
/// keeps being served until a newer fetch succeeds; lookups degrade to the
/// numeric id and never fail, since they only feed tooltip rendering.
#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    snapshot: Option<AccountMeta>,
    fetched_at: Option<DateTime<Utc>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| (now - fetched_at).num_seconds() < REFRESH_INTERVAL_SECS)
    }

    pub fn store(&mut self, snapshot: AccountMeta, now: DateTime<Utc>) {
        self.snapshot = Some(snapshot);
        self.fetched_at = Some(now);
    }

    pub fn project_name(&self, project_id: i64) -> String {
        self.snapshot
            .as_ref()
            .and_then(|meta| meta.projects.iter().find(|project| project.id == project_id))
            .map(|project| project.name.clone())
            .unwrap_or_else(|| project_id.to_string())
    }

    pub fn task_name(&self, task_id: i64) -> String {
        self.snapshot
            .as_ref()
            .and_then(|meta| meta.tasks.iter().find(|task| task.id == task_id))
            .map(|task| task.name.clone())
            .unwrap_or_else(|| task_id.to_string())
    }
}
