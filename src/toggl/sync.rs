use tracing::{debug, error, info, warn};

use crate::{
    timeline::{segment::TimelineSegment, Timeline},
    utils::clock::Clock,
};

use super::{
    backoff::Backoff,
    client::{TogglApi, TogglError},
    metadata::MetadataCache,
    models::TimeEntry,
};

/// Best-effort background synchronizer. Owns the backoff state shared by all
/// three remote operations, the metadata cache, and the last known tracking
/// status. Every operation swallows its own failures: a broken network tick
/// must never take the recorder down with it.
pub struct Synchronizer<A: TogglApi> {
    api: A,
    backoff: Backoff,
    metadata: MetadataCache,
    current_entry: Option<TimeEntry>,
    clock: Box<dyn Clock>,
}

impl<A: TogglApi> Synchronizer<A> {
    pub fn new(api: A, clock: Box<dyn Clock>) -> Self {
        Self {
            api,
            backoff: Backoff::new(),
            metadata: MetadataCache::new(),
            current_entry: None,
            clock,
        }
    }

    /// Whether the remote service currently has a running time entry. Only
    /// used to suppress tracking reminders, never fed back into the timeline.
    pub fn is_tracking(&self) -> bool {
        self.current_entry.is_some()
    }

    pub fn current_entry(&self) -> Option<&TimeEntry> {
        self.current_entry.as_ref()
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Polls which entry is being tracked right now.
    pub async fn refresh_tracking(&mut self) {
        if self.backoff.should_skip() {
            debug!("skipping tracking poll, backoff cooldown active");
            return;
        }

        match self.api.current_entry().await {
            Ok(entry) => {
                self.backoff.on_success();
                self.current_entry = entry;
            }
            Err(TogglError::RateLimited) => {
                warn!("tracking poll was rate limited");
                self.backoff.on_rate_limited();
            }
            Err(e) => error!("Failed to poll tracking status: {e}"),
        }
    }

    /// Refreshes the project/task lookup tables, at most once per cache
    /// interval. Staleness is checked before the backoff so a fresh cache
    /// never consumes a cooldown tick.
    pub async fn refresh_metadata(&mut self) {
        let now = self.clock.time();
        if self.metadata.is_fresh(now) {
            return;
        }
        if self.backoff.should_skip() {
            debug!("skipping metadata refresh, backoff cooldown active");
            return;
        }

        match self.api.account_meta().await {
            Ok(meta) => {
                self.backoff.on_success();
                self.metadata.store(meta, now);
            }
            Err(TogglError::RateLimited) => {
                warn!("metadata refresh was rate limited");
                self.backoff.on_rate_limited();
            }
            Err(e) => error!("Failed to update toggl metadata: {e}"),
        }
    }

    /// Runs one reconcile pass against a batch captured by the caller, then
    /// hands the synchronizer back together with the acknowledged id of a
    /// successful push. Consumes `self` so the pass can be held as an owned
    /// future while the caller keeps servicing events.
    pub async fn run_cycle(mut self, batch: Option<Vec<TimelineSegment>>) -> (Self, Option<u64>) {
        self.refresh_metadata().await;
        self.refresh_tracking().await;
        let acknowledged = self.push_batch(batch).await;
        (self, acknowledged)
    }

    /// Submits the sendable prefix of the timeline and trims the acknowledged
    /// entries. The newest entry is always withheld since a revival may still
    /// extend it; on any failure the timeline is left untouched and the same
    /// batch goes out verbatim on the next tick.
    pub async fn push_timeline(&mut self, timeline: &mut Timeline) {
        let batch = (timeline.len() >= 2).then(|| timeline.sendable());
        if let Some(id) = self.push_batch(batch).await {
            timeline.trim_acknowledged(id);
            info!(remaining = timeline.len(), "submitted timeline entries");
        }
    }

    /// The cooldown is consulted before the batch, so a tick with nothing to
    /// send still drains a pending skip like the poll and refresh paths do.
    async fn push_batch(&mut self, batch: Option<Vec<TimelineSegment>>) -> Option<u64> {
        if self.backoff.should_skip() {
            debug!("skipping timeline push, backoff cooldown active");
            return None;
        }
        let batch = batch?;
        let last_id = batch.last().map(|segment| segment.id);

        match self.api.push_timeline(batch).await {
            Ok(()) => {
                self.backoff.on_success();
                last_id
            }
            Err(TogglError::RateLimited) => {
                warn!("timeline push was rate limited");
                self.backoff.on_rate_limited();
                None
            }
            Err(e) => {
                error!("Failed to submit timeline entries: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod sync_tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use mockall::predicate::function;
    use reqwest::StatusCode;

    use crate::{
        timeline::{segment::TimelineSegment, Timeline},
        toggl::{
            client::{MockTogglApi, TogglError},
            models::{AccountMeta, TimeEntry},
        },
        utils::clock::test_support::ManualClock,
    };

    use super::Synchronizer;

    fn entry() -> TimeEntry {
        TimeEntry {
            id: 3134644072,
            billable: false,
            description: Some("refactor the uploader".into()),
            start: Utc.with_ymd_and_hms(2024, 3, 1, 9, 12, 0).unwrap(),
            stop: None,
            duration: -1709284320,
            workspace_id: 804672,
            project_id: Some(14767543),
            task_id: None,
            tag_ids: vec![],
        }
    }

    fn meta() -> AccountMeta {
        AccountMeta {
            id: 9000641,
            fullname: "Ada Lovelace".into(),
            default_workspace_id: 804672,
            projects: vec![],
            tasks: vec![],
            tags: vec![],
        }
    }

    fn segment(id: u64, start: i64) -> TimelineSegment {
        TimelineSegment {
            id,
            start_time: start,
            end_time: start + 60,
            desktop_id: Arc::from("desktop"),
            filename: Arc::from("firefox"),
            title: Arc::from("title"),
            idle: false,
        }
    }

    fn timeline_of(ids: &[u64]) -> Timeline {
        let mut timeline = Timeline::new();
        for (index, id) in ids.iter().enumerate() {
            timeline.push(segment(*id, index as i64 * 100));
        }
        timeline
    }

    fn synchronizer(api: MockTogglApi) -> (Synchronizer<MockTogglApi>, ManualClock) {
        let clock = ManualClock::new();
        (Synchronizer::new(api, Box::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn tracking_status_follows_the_polled_entry() {
        let mut api = MockTogglApi::new();
        let mut polled = vec![Ok(Some(entry())), Ok(None)].into_iter();
        api.expect_current_entry()
            .times(2)
            .returning(move || polled.next().unwrap());

        let (mut sync, _clock) = synchronizer(api);

        sync.refresh_tracking().await;
        assert!(sync.is_tracking());
        assert_eq!(sync.current_entry().unwrap().id, 3134644072);

        sync.refresh_tracking().await;
        assert!(!sync.is_tracking());
    }

    #[tokio::test]
    async fn failed_poll_keeps_the_previous_status() {
        let mut api = MockTogglApi::new();
        let mut polled = vec![
            Ok(Some(entry())),
            Err(TogglError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "oops".into(),
            }),
        ]
        .into_iter();
        api.expect_current_entry()
            .times(2)
            .returning(move || polled.next().unwrap());

        let (mut sync, _clock) = synchronizer(api);

        sync.refresh_tracking().await;
        sync.refresh_tracking().await;

        assert!(sync.is_tracking());
    }

    #[tokio::test]
    async fn rate_limit_skips_the_next_call_across_operations() {
        let mut api = MockTogglApi::new();
        api.expect_current_entry()
            .times(1)
            .returning(|| Err(TogglError::RateLimited));
        // the cooldown is shared: the push right after the 429 must not
        // reach the api at all
        api.expect_push_timeline().times(0);

        let (mut sync, _clock) = synchronizer(api);
        let mut timeline = timeline_of(&[1, 2, 3]);

        sync.refresh_tracking().await;
        sync.push_timeline(&mut timeline).await;

        assert_eq!(timeline.len(), 3);
    }

    #[tokio::test]
    async fn successful_push_trims_the_acknowledged_prefix() {
        let mut api = MockTogglApi::new();
        api.expect_push_timeline()
            .with(function(|batch: &Vec<TimelineSegment>| {
                batch.iter().map(|s| s.id).collect::<Vec<_>>() == vec![1, 2]
            }))
            .times(1)
            .returning(|_| Ok(()));

        let (mut sync, _clock) = synchronizer(api);
        let mut timeline = timeline_of(&[1, 2, 3]);

        sync.push_timeline(&mut timeline).await;

        assert_eq!(timeline.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn failed_push_retries_the_same_batch() {
        let mut api = MockTogglApi::new();
        let mut outcomes = vec![
            Err(TogglError::Transport("connection reset".into())),
            Ok(()),
        ]
        .into_iter();
        api.expect_push_timeline()
            .with(function(|batch: &Vec<TimelineSegment>| {
                batch.iter().map(|s| s.id).collect::<Vec<_>>() == vec![1, 2]
            }))
            .times(2)
            .returning(move |_| outcomes.next().unwrap());

        let (mut sync, _clock) = synchronizer(api);
        let mut timeline = timeline_of(&[1, 2, 3]);

        sync.push_timeline(&mut timeline).await;
        assert_eq!(timeline.len(), 3);

        sync.push_timeline(&mut timeline).await;
        assert_eq!(timeline.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn push_needs_at_least_two_entries() {
        let mut api = MockTogglApi::new();
        api.expect_push_timeline().times(0);

        let (mut sync, _clock) = synchronizer(api);

        let mut empty = Timeline::new();
        sync.push_timeline(&mut empty).await;

        let mut single = timeline_of(&[1]);
        sync.push_timeline(&mut single).await;
        assert_eq!(single.len(), 1);
    }

    #[tokio::test]
    async fn cycle_reports_the_acknowledged_id() {
        let mut api = MockTogglApi::new();
        api.expect_account_meta().times(1).returning(|| Ok(meta()));
        api.expect_current_entry()
            .times(1)
            .returning(|| Ok(Some(entry())));
        api.expect_push_timeline().times(1).returning(|_| Ok(()));

        let (sync, _clock) = synchronizer(api);
        let batch = vec![segment(1, 0), segment(2, 100)];

        let (sync, acknowledged) = sync.run_cycle(Some(batch)).await;

        assert_eq!(acknowledged, Some(2));
        assert!(sync.is_tracking());
    }

    #[tokio::test]
    async fn fresh_metadata_is_not_refetched() {
        let mut api = MockTogglApi::new();
        api.expect_account_meta().times(2).returning(|| Ok(meta()));

        let (mut sync, clock) = synchronizer(api);

        sync.refresh_metadata().await;
        // within the cache interval, no second fetch
        clock.advance(60);
        sync.refresh_metadata().await;
        // past it, the snapshot is refreshed
        clock.advance(10 * 60);
        sync.refresh_metadata().await;
    }

    #[tokio::test]
    async fn missing_credentials_leave_state_untouched() {
        let mut api = MockTogglApi::new();
        api.expect_current_entry()
            .times(1)
            .returning(|| Err(TogglError::Credentials));

        let (mut sync, _clock) = synchronizer(api);
        sync.refresh_tracking().await;

        assert!(!sync.is_tracking());
    }
}
