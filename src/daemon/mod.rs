use anyhow::Result;
use driver::Driver;
use status::TrackingReminder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    config::Settings,
    sway::{idle::IdleWatcher, watcher::WindowWatcher},
    timeline::recorder::SegmentRecorder,
    toggl::{
        client::{TogglApi, TogglClient},
        sync::Synchronizer,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod driver;
pub mod events;
pub mod shutdown;
pub mod status;

/// Represents the starting point for the daemon
pub async fn start_daemon(settings: Settings) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<events::ActivityEvent>(16);

    let shutdown_token = CancellationToken::new();

    let window_watcher = WindowWatcher::new(sender.clone());
    let idle_watcher = IdleWatcher::new(sender);
    let client = TogglClient::new(settings.auth.clone())?;
    let driver = create_driver(receiver, client, &settings, &shutdown_token, DefaultClock);

    let (_, window_result, idle_result, driver_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        window_watcher.run(shutdown_token.clone()),
        idle_watcher.run(shutdown_token.clone()),
        driver.run(),
    );

    if let Err(window_result) = window_result {
        error!("Window watcher got an error {:?}", window_result);
    }

    if let Err(idle_result) = idle_result {
        error!("Idle watcher got an error {:?}", idle_result);
    }

    if let Err(driver_result) = driver_result {
        error!("Driver got an error {:?}", driver_result);
    }

    Ok(())
}

fn create_driver<A: TogglApi + 'static>(
    receiver: mpsc::Receiver<events::ActivityEvent>,
    api: A,
    settings: &Settings,
    shutdown_token: &CancellationToken,
    clock: impl Clock + Clone,
) -> Driver<A> {
    Driver::new(
        receiver,
        SegmentRecorder::new(settings.desktop_id.clone(), Box::new(clock.clone())),
        Synchronizer::new(api, Box::new(clock.clone())),
        TrackingReminder::new(settings.idle_notify_interval),
        shutdown_token.clone(),
        Box::new(clock),
    )
}
