//! Personal time-tracking companion for sway. Watches which window has
//! focus, records activity segments, and reconciles them against Toggl
//! Track, while the bar shows whether a time entry is running.

pub mod config;
pub mod daemon;
pub mod sway;
pub mod timeline;
pub mod toggl;
pub mod utils;
