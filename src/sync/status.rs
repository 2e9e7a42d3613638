use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;

/// What a view's sync badge shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    /// An edit is waiting out the quiet period.
    Pending { due_in_ms: u64 },
    Saving,
    Synced { at: DateTime<Utc> },
    Error { message: String },
}

impl SyncStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error { .. })
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "ready"),
            SyncStatus::Pending { due_in_ms } => {
                write!(f, "saving in {}s", due_in_ms.div_ceil(1000))
            }
            SyncStatus::Saving => write!(f, "saving"),
            SyncStatus::Synced { at } => {
                write!(f, "synced {}", at.with_timezone(&Local).format("%H:%M:%S"))
            }
            SyncStatus::Error { message } => write!(f, "error: {}", message),
        }
    }
}
