use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::daemon::events::ActivityEvent;

use super::{
    events::{WindowChange, WindowEvent, WorkspaceChange, WorkspaceEvent},
    ipc::{SwayIpc, EVENT_WINDOW, EVENT_WORKSPACE},
};

/// Subscribes to sway window/workspace events and translates them into
/// [ActivityEvent]s. Tracks which container currently has focus so that
/// close and title events from background windows are ignored.
pub struct WindowWatcher {
    next: mpsc::Sender<ActivityEvent>,
    focused_container: Option<i64>,
}

impl WindowWatcher {
    pub fn new(next: mpsc::Sender<ActivityEvent>) -> Self {
        Self {
            next,
            focused_container: None,
        }
    }

    /// Executes the watcher event loop.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let mut ipc = SwayIpc::connect().await?;
        ipc.subscribe(&["window", "workspace"]).await?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                received = ipc.receive() => {
                    let (message_type, payload) = received?;
                    if let Some(event) = self.translate(message_type, &payload) {
                        self.next.send(event).await?;
                    }
                }
            }
        }
    }

    /// Best effort: a payload that fails to parse is logged and skipped
    /// rather than tearing the subscription down.
    fn translate(&mut self, message_type: u32, payload: &[u8]) -> Option<ActivityEvent> {
        match message_type {
            EVENT_WINDOW => match serde_json::from_slice::<WindowEvent>(payload) {
                Ok(event) => self.on_window_event(event),
                Err(e) => {
                    warn!("ignoring malformed window event: {e}");
                    None
                }
            },
            EVENT_WORKSPACE => match serde_json::from_slice::<WorkspaceEvent>(payload) {
                Ok(event) => Self::on_workspace_event(event),
                Err(e) => {
                    warn!("ignoring malformed workspace event: {e}");
                    None
                }
            },
            other => {
                debug!("ignoring ipc message type {other:#x}");
                None
            }
        }
    }

    fn on_window_event(&mut self, event: WindowEvent) -> Option<ActivityEvent> {
        let container = event.container;
        match event.change {
            WindowChange::Focus => {
                self.focused_container = Some(container.id);
                Some(ActivityEvent::Focus {
                    app_id: container.app_id.unwrap_or_default(),
                    title: container.name.unwrap_or_default(),
                })
            }
            WindowChange::Close if self.focused_container == Some(container.id) => {
                self.focused_container = None;
                Some(ActivityEvent::FocusLost)
            }
            WindowChange::Title if self.focused_container == Some(container.id) => {
                Some(ActivityEvent::TitleChanged {
                    title: container.name.unwrap_or_default(),
                })
            }
            _ => None,
        }
    }

    /// Focusing an empty workspace means nothing is focused anymore.
    fn on_workspace_event(event: WorkspaceEvent) -> Option<ActivityEvent> {
        match event.change {
            WorkspaceChange::Focus
                if event
                    .current
                    .as_ref()
                    .is_some_and(|workspace| workspace.nodes.is_empty()) =>
            {
                Some(ActivityEvent::FocusLost)
            }
            _ => None,
        }
    }
}
