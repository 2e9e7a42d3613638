#![allow(dead_code)]

use async_trait::async_trait;
use reelkit_sync::error::SyncError;
use reelkit_sync::local::LocalStore;
use reelkit_sync::remote::{encode_key, BlobRef, PushAck, RemoteStore, SyncPayload, SyncSnapshot};
use reelkit_sync::server::RemoteDb;
use reelkit_sync::sync::{ManualClock, SyncEngine, SyncTracker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-process remote store that records every push and can be switched offline.
pub struct FakeRemote {
    pub db: RemoteDb,
    pushes: Mutex<Vec<SyncPayload>>,
    offline: AtomicBool,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            db: RemoteDb::in_memory().unwrap(),
            pushes: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<SyncPayload> {
        self.pushes.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn push(&self, payload: &SyncPayload) -> Result<PushAck, SyncError> {
        self.check_online()?;
        self.pushes.lock().unwrap().push(payload.clone());
        self.db.upsert(payload)?;
        Ok(PushAck {
            success: true,
            timestamp: 1,
        })
    }

    async fn pull(&self) -> Result<SyncSnapshot, SyncError> {
        self.check_online()?;
        Ok(self.db.snapshot()?)
    }

    async fn upload_blob(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<BlobRef, SyncError> {
        self.check_online()?;
        self.db.put_blob(key, content_type, &bytes)?;
        Ok(BlobRef {
            key: key.to_string(),
            url: format!("/api/images/{}", encode_key(key)),
        })
    }

    async fn delete_project(&self, id: &str) -> Result<(), SyncError> {
        self.check_online()?;
        self.db.delete_project(id)?;
        Ok(())
    }

    async fn delete_inspiration(&self, id: &str) -> Result<(), SyncError> {
        self.check_online()?;
        self.db.delete_inspiration(id)?;
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub remote: Arc<FakeRemote>,
    pub clock: Arc<ManualClock>,
}

/// Engine over an in-memory local store, a fake remote and a manual clock.
pub fn harness() -> Harness {
    let local = Arc::new(LocalStore::in_memory().unwrap());
    let remote = Arc::new(FakeRemote::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let tracker = SyncTracker::new(local.clone(), clock.clone());
    let engine = Arc::new(SyncEngine::new(local, remote.clone(), tracker));
    Harness {
        engine,
        remote,
        clock,
    }
}
