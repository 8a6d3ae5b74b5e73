use tokio::select;
use tokio_util::sync::CancellationToken;

/// Waits for a termination signal and cancels the daemon. Waybar sends
/// SIGTERM on exit; ctrl-c covers running in a terminal.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => signal,
        Err(_) => {
            // fall back to ctrl-c only
            let _ = tokio::signal::ctrl_c().await;
            cancelation.cancel();
            return;
        }
    };

    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = sigterm.recv() => {
            cancelation.cancel();
        },
    };
}
