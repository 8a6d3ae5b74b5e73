use anyhow::Result;

/// The daemon runs everything on one thread: the event driver relies on
/// cooperative scheduling instead of locks.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
