//! Local-first synchronization.
//!
//! - [`tracker`]: per-module change/upload stamps and the derived dirty set
//! - [`engine`]: push one module / pull everything
//! - [`autosave`]: debounced save-and-push per editable view
//! - [`idle`]: pull in the background while the user is inactive

pub mod autosave;
pub mod engine;
pub mod idle;
pub mod offload;
pub mod sanitize;
pub mod state;
pub mod status;
pub mod tracker;

pub use autosave::{AutoSave, SaveTarget, DEFAULT_QUIET_PERIOD};
pub use engine::{PullSummary, SyncEngine};
pub use idle::{ActivityMonitor, BusyGuard, IdlePullConfig, IdlePuller, PullTarget};
pub use sanitize::sanitize_project;
pub use state::{Clock, ManualClock, MemorySyncState, StampKind, SyncStateStore, SystemClock};
pub use status::SyncStatus;
pub use tracker::SyncTracker;
