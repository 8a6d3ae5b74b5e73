use std::{
    future::{pending, Future},
    pin::Pin,
    process::Stdio,
    time::Duration,
};

use anyhow::Result;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    timeline::recorder::SegmentRecorder,
    toggl::{client::TogglApi, metadata::MetadataCache, sync::Synchronizer},
    utils::clock::Clock,
};

use super::{
    events::ActivityEvent,
    status::{self, TrackingReminder},
};

/// How often the remote service is reconciled: tracking status, metadata,
/// timeline push.
const SYNC_INTERVAL: Duration = Duration::from_secs(150);
/// How often the waybar line is reprinted.
const STATUS_INTERVAL: Duration = Duration::from_millis(500);
/// How long an unfinished remote call may delay shutdown.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

/// A reconcile pass in flight, holding the synchronizer until it completes.
type SyncCycle<A> = Pin<Box<dyn Future<Output = (Synchronizer<A>, Option<u64>)>>>;

/// The single event loop of the daemon. Owns the recorder and the
/// synchronizer and multiplexes activity events, the rename-debounce
/// deadline, the sync cadence and the status cadence over one task, so none
/// of the shared state needs locking. The remote pass is polled as its own
/// arm: a slow or hung call never stops event processing, the status line,
/// or shutdown.
pub struct Driver<A: TogglApi> {
    receiver: mpsc::Receiver<ActivityEvent>,
    recorder: SegmentRecorder,
    sync: Synchronizer<A>,
    reminder: TrackingReminder,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<A: TogglApi + 'static> Driver<A> {
    pub fn new(
        receiver: mpsc::Receiver<ActivityEvent>,
        recorder: SegmentRecorder,
        sync: Synchronizer<A>,
        reminder: TrackingReminder,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            receiver,
            recorder,
            sync,
            reminder,
            shutdown,
            clock,
        }
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            mut receiver,
            mut recorder,
            sync,
            mut reminder,
            shutdown,
            clock,
        } = self;

        let mut idle = false;
        // the synchronizer lives here between passes and inside the cycle
        // future while one is in flight; exactly one of the two holds it
        let mut engine = Some(sync);
        let mut cycle: Option<SyncCycle<A>> = None;
        // rendered by the status arm while the synchronizer is in flight
        let mut bar_entry = None;
        let mut bar_metadata = MetadataCache::new();

        // first sync fires immediately so the bar is populated on startup
        let mut next_sync = clock.instant();
        let mut next_status = clock.instant() + STATUS_INTERVAL;

        loop {
            let rename_deadline = recorder.rename_deadline();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = receiver.recv() => {
                    match event {
                        Some(event) => {
                            debug!("applying event {event:?}");
                            apply_event(&mut recorder, &mut idle, event);
                        }
                        // every producer is gone, nothing more will arrive
                        None => break,
                    }
                }
                _ = sleep_until_deadline(clock.as_ref(), rename_deadline),
                    if rename_deadline.is_some() =>
                {
                    recorder.apply_pending_rename();
                }
                _ = clock.sleep_until(next_sync), if cycle.is_none() => {
                    next_sync += SYNC_INTERVAL;
                    if let Some(engine_now) = engine.take() {
                        bar_entry = engine_now.current_entry().cloned();
                        bar_metadata = engine_now.metadata().clone();
                        let batch = (recorder.timeline().len() >= 2)
                            .then(|| recorder.timeline().sendable());
                        cycle = Some(Box::pin(engine_now.run_cycle(batch)));
                    }
                }
                (returned, acknowledged) = finished_cycle(&mut cycle), if cycle.is_some() => {
                    if let Some(id) = acknowledged {
                        recorder.timeline_mut().trim_acknowledged(id);
                        info!(
                            remaining = recorder.timeline().len(),
                            "submitted timeline entries"
                        );
                    }
                    if reminder.evaluate(idle, returned.is_tracking(), clock.time()) {
                        send_reminder();
                    }
                    engine = Some(returned);
                    cycle = None;
                }
                _ = clock.sleep_until(next_status) => {
                    next_status += STATUS_INTERVAL;
                    let (entry, metadata) = match engine.as_ref() {
                        Some(engine) => (engine.current_entry(), engine.metadata()),
                        None => (bar_entry.as_ref(), &bar_metadata),
                    };
                    println!("{}", status::waybar_block(entry, metadata, clock.time()));
                }
            }
        }

        // drain an unfinished pass before the final flush, bounded so a
        // wedged call cannot hold up shutdown
        if let Some(mut unfinished) = cycle {
            tokio::select! {
                (returned, acknowledged) = &mut unfinished => {
                    if let Some(id) = acknowledged {
                        recorder.timeline_mut().trim_acknowledged(id);
                    }
                    engine = Some(returned);
                }
                _ = clock.sleep(SHUTDOWN_DRAIN) => {
                    warn!("remote call still unfinished at shutdown, abandoning it");
                }
            }
        }

        // flush on the way out: finalize whatever was being recorded and try
        // to get the sendable prefix acknowledged one last time
        recorder.stop_segment();
        if let Some(mut engine) = engine {
            engine.push_timeline(recorder.timeline_mut()).await;
        }
        info!(
            pending = recorder.timeline().len(),
            "driver stopped"
        );
        Ok(())
    }
}

fn apply_event(recorder: &mut SegmentRecorder, idle: &mut bool, event: ActivityEvent) {
    match event {
        ActivityEvent::Focus { app_id, title } => recorder.start_segment(&app_id, &title, *idle),
        ActivityEvent::FocusLost => recorder.stop_segment(),
        ActivityEvent::TitleChanged { title } => recorder.rename_title(&title),
        ActivityEvent::IdleChanged { idle: is_idle } => {
            *idle = is_idle;
            recorder.set_idle(is_idle);
        }
    }
}

async fn sleep_until_deadline(clock: &dyn Clock, deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => clock.sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn finished_cycle<A: TogglApi>(
    cycle: &mut Option<SyncCycle<A>>,
) -> (Synchronizer<A>, Option<u64>) {
    match cycle.as_mut() {
        Some(cycle) => cycle.await,
        None => pending().await,
    }
}

/// Fire-and-forget desktop notification. A missing notify-send is only worth
/// a log line.
fn send_reminder() {
    let spawned = tokio::process::Command::new("notify-send")
        .args([
            "--app-name=Toggl Track",
            "Toggl Track",
            "Remember to track your time!",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(_) => info!("sent tracking reminder"),
        Err(e) => warn!("failed to send tracking reminder: {e}"),
    }
}
