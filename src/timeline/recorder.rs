use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::utils::clock::Clock;

use super::{
    segment::{RecordingSegment, TimelineSegment},
    Timeline,
};

/// Activity shorter than this is considered noise and never finalized.
const MIN_SEGMENT_SECONDS: i64 = 10;
/// Window titles churn rapidly (page loads, progress counters). A rename only
/// takes effect once the title has been stable for this long.
const RENAME_DEBOUNCE: Duration = Duration::from_secs(10);

struct PendingRename {
    segment_id: u64,
    title: Arc<str>,
    deadline: Instant,
}

/// State machine that owns the in-progress segment and the finalized
/// timeline. It is either empty or recording exactly one segment; every
/// focus/idle/title event from the compositor funnels through here.
pub struct SegmentRecorder {
    timeline: Timeline,
    recording: Option<RecordingSegment>,
    pending_rename: Option<PendingRename>,
    desktop_id: Arc<str>,
    clock: Box<dyn Clock>,
}

impl SegmentRecorder {
    pub fn new(desktop_id: Arc<str>, clock: Box<dyn Clock>) -> Self {
        Self {
            timeline: Timeline::new(),
            recording: None,
            pending_rename: None,
            desktop_id,
            clock,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Begins recording a new activity, finalizing whatever was being
    /// recorded before. When the previous finalized entry describes the same
    /// `(filename, title)` it is popped off the timeline and continued
    /// instead, so briefly switching away and back yields one segment.
    pub fn start_segment(&mut self, filename: &str, title: &str, idle: bool) {
        if self.recording.is_some() {
            self.stop_segment();
        }

        let revived = match self.timeline.last() {
            Some(last) if &*last.filename == filename && &*last.title == title => {
                self.timeline.pop_last()
            }
            _ => None,
        };
        if let Some(last) = revived {
            debug!(filename, title, "reviving previous segment");
            self.recording = Some(RecordingSegment::reopen(last));
            return;
        }

        self.recording = Some(RecordingSegment::open(
            self.desktop_id.clone(),
            Arc::from(filename),
            Arc::from(title),
            idle,
            self.clock.time().timestamp(),
        ));
    }

    /// Finalizes the current segment, if any. Segments that lasted less than
    /// [MIN_SEGMENT_SECONDS] are dropped rather than recorded.
    pub fn stop_segment(&mut self) {
        let Some(recording) = self.recording.take() else {
            return;
        };
        let end_time = self.clock.time().timestamp();

        if end_time - recording.start_time < MIN_SEGMENT_SECONDS {
            debug!(
                filename = &*recording.filename,
                title = &*recording.title,
                "discarding segment shorter than {MIN_SEGMENT_SECONDS}s"
            );
            return;
        }

        self.timeline.push(recording.close(end_time));
    }

    /// Routes an idle transition through [Self::start_segment] so it is
    /// subject to the same revive-or-replace policy. An idle flicker on an
    /// unchanged window therefore collapses back into one segment.
    pub fn set_idle(&mut self, idle: bool) {
        let Some(recording) = &self.recording else {
            return;
        };
        let filename = recording.filename.clone();
        let title = recording.title.clone();
        self.start_segment(&filename, &title, idle);
    }

    /// Requests a debounced title change for the current segment. Any earlier
    /// pending rename is cancelled; the new one applies through
    /// [Self::apply_pending_rename] once [Self::rename_deadline] elapses.
    pub fn rename_title(&mut self, title: &str) {
        self.pending_rename = None;

        let Some(recording) = &self.recording else {
            return;
        };
        self.pending_rename = Some(PendingRename {
            segment_id: recording.id,
            title: Arc::from(title),
            deadline: self.clock.instant() + RENAME_DEBOUNCE,
        });
    }

    /// Deadline of the armed rename, for the caller to sleep on.
    pub fn rename_deadline(&self) -> Option<Instant> {
        self.pending_rename.as_ref().map(|pending| pending.deadline)
    }

    /// Applies the pending rename, provided the segment that requested it is
    /// still the one being recorded. The title changes in place, keeping the
    /// segment's id and start time; if the previous finalized entry already
    /// carries the new `(filename, title)` the recording folds back into it
    /// instead.
    pub fn apply_pending_rename(&mut self) {
        let Some(pending) = self.pending_rename.take() else {
            return;
        };
        let Some(recording) = self.recording.as_mut() else {
            return;
        };
        if recording.id != pending.segment_id {
            return;
        }

        let folds_into_tail = self.timeline.last().is_some_and(|last| {
            last.filename == recording.filename && last.title == pending.title
        });
        if folds_into_tail {
            if let Some(last) = self.timeline.pop_last() {
                debug!(title = &*pending.title, "rename folds into previous segment");
                *recording = RecordingSegment::reopen(last);
            }
            return;
        }

        debug!(
            from = &*recording.title,
            to = &*pending.title,
            "renaming current segment"
        );
        recording.title = pending.title;
    }

    #[cfg(test)]
    fn current(&self) -> Option<&RecordingSegment> {
        self.recording.as_ref()
    }
}
