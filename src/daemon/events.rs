/// Normalized activity events produced by the compositor watchers and
/// consumed by the recorder driver. Both watchers feed the same channel, so
/// the driver sees focus and idle transitions in one strictly ordered stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    /// A window gained focus.
    Focus { app_id: String, title: String },
    /// The focused window went away, or the workspace emptied.
    FocusLost,
    /// The focused window changed its title.
    TitleChanged { title: String },
    /// The user crossed the idle threshold, in either direction.
    IdleChanged { idle: bool },
}
