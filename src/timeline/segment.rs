use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

/// Largest id the remote timeline endpoint accepts (2^48 - 1).
const MAX_SEGMENT_ID: u64 = 281_474_976_710_655;

/// A finalized unit of observed activity, immutable once created. These are
/// what gets serialized and shipped to the timeline endpoint.
#[derive(PartialEq, Eq, Debug, Serialize, Clone)]
pub struct TimelineSegment {
    pub id: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub desktop_id: Arc<str>,
    pub filename: Arc<str>,
    pub title: Arc<str>,
    pub idle: bool,
}

/// The single in-progress segment. Same shape as [TimelineSegment] without an
/// end time. At most one exists at any moment and it belongs to the recorder.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RecordingSegment {
    pub id: u64,
    pub start_time: i64,
    pub desktop_id: Arc<str>,
    pub filename: Arc<str>,
    pub title: Arc<str>,
    pub idle: bool,
}

impl RecordingSegment {
    pub fn open(
        desktop_id: Arc<str>,
        filename: Arc<str>,
        title: Arc<str>,
        idle: bool,
        start_time: i64,
    ) -> Self {
        Self {
            id: rand::thread_rng().gen_range(0..=MAX_SEGMENT_ID),
            start_time,
            desktop_id,
            filename,
            title,
            idle,
        }
    }

    /// Turns a finalized segment back into the in-progress one, keeping its
    /// original id and start time.
    pub fn reopen(segment: TimelineSegment) -> Self {
        Self {
            id: segment.id,
            start_time: segment.start_time,
            desktop_id: segment.desktop_id,
            filename: segment.filename,
            title: segment.title,
            idle: segment.idle,
        }
    }

    pub fn close(self, end_time: i64) -> TimelineSegment {
        TimelineSegment {
            id: self.id,
            start_time: self.start_time,
            end_time,
            desktop_id: self.desktop_id,
            filename: self.filename,
            title: self.title,
            idle: self.idle,
        }
    }
}
