use super::state::{Clock, StampKind, SyncStateStore};
use crate::module::Module;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Change/upload tracker for the four modules.
///
/// Stamps handed out by one tracker are strictly increasing even when the
/// clock does not move between calls, so a change recorded after an upload
/// always compares greater than it.
#[derive(Clone)]
pub struct SyncTracker {
    state: Arc<dyn SyncStateStore>,
    clock: Arc<dyn Clock>,
    last_stamp: Arc<AtomicI64>,
}

impl SyncTracker {
    pub fn new(state: Arc<dyn SyncStateStore>, clock: Arc<dyn Clock>) -> Self {
        // Start above anything already persisted, in case the clock went backwards.
        let mut highest = 0;
        for module in Module::ALL {
            for kind in [StampKind::Change, StampKind::Upload] {
                highest = highest.max(state.timestamp(kind, module).unwrap_or(0));
            }
        }
        Self {
            state,
            clock,
            last_stamp: Arc::new(AtomicI64::new(highest)),
        }
    }

    /// Current time from the injected clock, in epoch millis.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Next stamp: the current time, bumped past the previous stamp if needed.
    pub fn stamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let mut prev = self.last_stamp.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self
                .last_stamp
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Record a local mutation. Never fails; a storage error is logged.
    pub fn track_change(&self, module: Module) {
        let at = self.stamp();
        self.write(StampKind::Change, module, at);
    }

    /// Record a confirmed upload at the current time.
    pub fn record_upload(&self, module: Module) {
        let at = self.stamp();
        self.record_upload_at(module, at);
    }

    /// Record a confirmed upload of the snapshot taken at `at`. Changes
    /// stamped after `at` stay dirty.
    pub fn record_upload_at(&self, module: Module, at: i64) {
        self.write(StampKind::Upload, module, at);
    }

    /// Mark `modules` clean and current: both stamps set to the same instant.
    pub fn mark_synced(&self, modules: &[Module]) {
        let at = self.stamp();
        for &module in modules {
            self.write(StampKind::Change, module, at);
            self.write(StampKind::Upload, module, at);
        }
    }

    pub fn change_time(&self, module: Module) -> i64 {
        self.read(StampKind::Change, module)
    }

    pub fn upload_time(&self, module: Module) -> i64 {
        self.read(StampKind::Upload, module)
    }

    pub fn is_dirty(&self, module: Module) -> bool {
        self.change_time(module) > self.upload_time(module)
    }

    /// Modules with changes not yet pushed, in display order.
    pub fn unsaved_modules(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|m| self.is_dirty(*m))
            .collect()
    }

    /// Labels of [`Self::unsaved_modules`], for the pending indicator.
    pub fn unsaved_labels(&self) -> Vec<&'static str> {
        self.unsaved_modules().iter().map(Module::label).collect()
    }

    fn read(&self, kind: StampKind, module: Module) -> i64 {
        match self.state.timestamp(kind, module) {
            Ok(at) => at,
            Err(e) => {
                warn!("Failed to read {:?} stamp for {}: {}", kind, module, e);
                0
            }
        }
    }

    fn write(&self, kind: StampKind, module: Module, at: i64) {
        if let Err(e) = self.state.set_timestamp(kind, module, at) {
            warn!("Failed to persist {:?} stamp for {}: {}", kind, module, e);
        }
    }
}
