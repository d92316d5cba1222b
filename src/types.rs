use std::fmt;

/// Lifecycle state of a [`BackupWatcher`](crate::watch::BackupWatcher).
///
/// - `Stopped`: notifications are not registered; pending changes are dropped.
/// - `Running`: notifications are recorded and flushed after the debounce delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

impl RunState {
    pub fn is_running(self) -> bool {
        self == RunState::Running
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped => f.write_str("stopped"),
            RunState::Running => f.write_str("running"),
        }
    }
}
