//! Serde models for the sway event payloads, reduced to the fields the
//! watcher actually reads.

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
pub struct Container {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Wayland app id. Absent for xwayland windows.
    #[serde(default)]
    pub app_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct WindowEvent {
    pub change: WindowChange,
    pub container: Container,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceChange {
    Init,
    Empty,
    Focus,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
pub struct Workspace {
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub struct WorkspaceEvent {
    pub change: WorkspaceChange,
    pub current: Option<Workspace>,
}
