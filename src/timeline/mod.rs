//! The in-memory activity timeline. Finalized segments are appended at the
//! tail as the user switches activities and trimmed from the head once the
//! uploader gets them acknowledged, so the structure behaves like an outbox.

pub mod recorder;
pub mod segment;

use std::collections::VecDeque;

use segment::TimelineSegment;

/// Ordered sequence of finalized segments, insertion order is chronological.
/// Entries are never reordered or mutated after appension; the only removals
/// are tail pops for segment revival and head trims after an acknowledged
/// upload.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: VecDeque<TimelineSegment>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, segment: TimelineSegment) {
        self.entries.push_back(segment);
    }

    pub fn last(&self) -> Option<&TimelineSegment> {
        self.entries.back()
    }

    pub fn pop_last(&mut self) -> Option<TimelineSegment> {
        self.entries.pop_back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineSegment> {
        self.entries.iter()
    }

    /// Everything except the most recent entry. The last entry is withheld
    /// from uploads because it may still be extended by a revival.
    pub fn sendable(&self) -> Vec<TimelineSegment> {
        self.entries
            .iter()
            .take(self.entries.len().saturating_sub(1))
            .cloned()
            .collect()
    }

    /// Removes everything up to and including the entry with `id`. The id is
    /// located by a linear scan rather than an assumed index, since entries
    /// before it may already have been trimmed by an earlier acknowledged
    /// push. No-op when the id is not present.
    pub fn trim_acknowledged(&mut self, id: u64) {
        if let Some(position) = self.entries.iter().position(|entry| entry.id == id) {
            self.entries.drain(..=position);
        }
    }
}
