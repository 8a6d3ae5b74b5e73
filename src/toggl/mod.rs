//! Everything that talks to Toggl Track. [client::TogglClient] wraps the
//! three remote endpoints, [sync::Synchronizer] drives them on a shared
//! [backoff::Backoff] cooldown and owns the cached account metadata.

pub mod backoff;
pub mod client;
pub mod metadata;
pub mod models;
pub mod sync;
