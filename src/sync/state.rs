//! Persistent per-module sync timestamps.
//!
//! Two timestamps are kept per module: when it last changed locally and when
//! it was last confirmed uploaded. The dirty bit is derived from them and is
//! never stored.

use crate::error::StoreError;
use crate::local::LocalStore;
use crate::module::Module;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampKind {
    /// Last local mutation.
    Change,
    /// Last confirmed push.
    Upload,
}

impl StampKind {
    fn as_str(&self) -> &'static str {
        match self {
            StampKind::Change => "change",
            StampKind::Upload => "upload",
        }
    }
}

/// Storage for the tracker timestamps. A missing timestamp reads as 0.
pub trait SyncStateStore: Send + Sync {
    fn timestamp(&self, kind: StampKind, module: Module) -> Result<i64, StoreError>;
    fn set_timestamp(&self, kind: StampKind, module: Module, at: i64) -> Result<(), StoreError>;
}

/// Settings key holding one timestamp.
pub fn settings_key(kind: StampKind, module: Module) -> String {
    format!("sync.{}.{}", kind.as_str(), module.as_str())
}

impl SyncStateStore for LocalStore {
    fn timestamp(&self, kind: StampKind, module: Module) -> Result<i64, StoreError> {
        let raw = self.get_setting(&settings_key(kind, module))?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    fn set_timestamp(&self, kind: StampKind, module: Module, at: i64) -> Result<(), StoreError> {
        self.set_setting(&settings_key(kind, module), &at.to_string())
    }
}

/// Non-persistent state, for views that do not need to survive a restart.
#[derive(Debug, Default)]
pub struct MemorySyncState {
    stamps: Mutex<HashMap<(StampKind, Module), i64>>,
}

impl MemorySyncState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncStateStore for MemorySyncState {
    fn timestamp(&self, kind: StampKind, module: Module) -> Result<i64, StoreError> {
        let stamps = self.stamps.lock().unwrap_or_else(|e| e.into_inner());
        Ok(stamps.get(&(kind, module)).copied().unwrap_or(0))
    }

    fn set_timestamp(&self, kind: StampKind, module: Module, at: i64) -> Result<(), StoreError> {
        let mut stamps = self.stamps.lock().unwrap_or_else(|e| e.into_inner());
        stamps.insert((kind, module), at);
        Ok(())
    }
}
