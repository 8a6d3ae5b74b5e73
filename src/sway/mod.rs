//! Event sources for the recorder: the sway IPC window/workspace
//! subscription and the swayidle-backed idle detector. Both feed the same
//! [ActivityEvent](crate::daemon::events::ActivityEvent) channel.

pub mod events;
pub mod idle;
pub mod ipc;
pub mod watcher;
