use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::toggl::{metadata::MetadataCache, models::TimeEntry};

/// One waybar custom-module line. Waybar reads these as JSON from stdout.
#[derive(Serialize)]
struct WaybarBlock<'a> {
    text: &'a str,
    alt: &'a str,
    tooltip: String,
    percentage: u8,
    class: &'a str,
}

/// Renders the status line for the bar: a clock glyph whose tooltip carries
/// the running entry's description, project/task names resolved through the
/// metadata cache, and the elapsed time.
pub fn waybar_block(
    entry: Option<&TimeEntry>,
    metadata: &MetadataCache,
    now: DateTime<Utc>,
) -> String {
    let tooltip = match entry {
        Some(entry) => {
            let mut lines = vec![entry
                .description
                .clone()
                .unwrap_or_else(|| "(no description)".to_string())];

            match (entry.project_id, entry.task_id) {
                (Some(project_id), Some(task_id)) => lines.push(format!(
                    "{}: {}",
                    metadata.project_name(project_id),
                    metadata.task_name(task_id)
                )),
                (Some(project_id), None) => lines.push(metadata.project_name(project_id)),
                _ => {}
            }

            let elapsed = (now - entry.start).num_seconds().max(0);
            lines.push(format!(
                "{}:{:02}:{:02}",
                elapsed / 3600,
                elapsed % 3600 / 60,
                elapsed % 60
            ));
            lines.join("\r")
        }
        None => "Not tracking".to_string(),
    };

    let tracking = entry.is_some();
    let block = WaybarBlock {
        text: "\u{f64f}",
        alt: "",
        tooltip,
        percentage: if tracking { 100 } else { 0 },
        class: if tracking { "tracking" } else { "disabled" },
    };
    serde_json::to_string(&block).unwrap_or_default()
}

/// Remembers when the user was last nagged about not tracking. Any tick that
/// observes active tracking pushes the nag out by a full interval.
pub struct TrackingReminder {
    interval: Duration,
    last_notified: Option<DateTime<Utc>>,
}

impl TrackingReminder {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_notified: None,
        }
    }

    /// Returns true when a reminder is due right now.
    pub fn evaluate(&mut self, idle: bool, tracking: bool, now: DateTime<Utc>) -> bool {
        if tracking {
            self.last_notified = Some(now);
            return false;
        }
        if idle {
            return false;
        }

        let due = self
            .last_notified
            .map_or(true, |last| (now - last).num_seconds() >= self.interval.as_secs() as i64);
        if due {
            self.last_notified = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod status_tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::toggl::{
        metadata::MetadataCache,
        models::{AccountMeta, Project, Task, TimeEntry},
    };

    use super::{waybar_block, TrackingReminder};

    fn entry() -> TimeEntry {
        TimeEntry {
            id: 1,
            billable: false,
            description: Some("write docs".into()),
            start: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            stop: None,
            duration: -1,
            workspace_id: 804672,
            project_id: Some(11),
            task_id: Some(21),
            tag_ids: vec![],
        }
    }

    fn metadata() -> MetadataCache {
        let mut cache = MetadataCache::new();
        cache.store(
            AccountMeta {
                id: 1,
                fullname: "Ada Lovelace".into(),
                default_workspace_id: 804672,
                projects: vec![Project {
                    id: 11,
                    name: "Analytical Engine".into(),
                    active: true,
                    color: String::new(),
                }],
                tasks: vec![Task {
                    id: 21,
                    name: "Punch cards".into(),
                    project_id: Some(11),
                }],
                tags: vec![],
            },
            Utc::now(),
        );
        cache
    }

    #[test]
    fn tooltip_shows_description_names_and_elapsed_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 30).unwrap();

        let block = waybar_block(Some(&entry()), &metadata(), now);

        assert!(block.contains("write docs"));
        assert!(block.contains("Analytical Engine: Punch cards"));
        assert!(block.contains("1:05:30"));
        assert!(block.contains(r#""class":"tracking""#));
        assert!(block.contains(r#""percentage":100"#));
    }

    #[test]
    fn not_tracking_renders_the_disabled_block() {
        let block = waybar_block(None, &MetadataCache::new(), Utc::now());

        assert!(block.contains("Not tracking"));
        assert!(block.contains(r#""class":"disabled""#));
        assert!(block.contains(r#""percentage":0"#));
    }

    #[test]
    fn reminder_fires_when_active_and_untracked() {
        let mut reminder = TrackingReminder::new(Duration::from_secs(300));
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        assert!(reminder.evaluate(false, false, now));
        // nagged a moment ago, not again yet
        assert!(!reminder.evaluate(false, false, now + chrono::Duration::seconds(100)));
        assert!(reminder.evaluate(false, false, now + chrono::Duration::seconds(300)));
    }

    #[test]
    fn reminder_is_suppressed_while_idle() {
        let mut reminder = TrackingReminder::new(Duration::from_secs(300));
        assert!(!reminder.evaluate(true, false, Utc::now()));
    }

    #[test]
    fn tracking_resets_the_reminder_timer() {
        let mut reminder = TrackingReminder::new(Duration::from_secs(300));
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        assert!(!reminder.evaluate(false, true, now));
        // tracking just stopped; the full interval applies from that tick
        assert!(!reminder.evaluate(false, false, now + chrono::Duration::seconds(100)));
        assert!(reminder.evaluate(false, false, now + chrono::Duration::seconds(300)));
    }
}
