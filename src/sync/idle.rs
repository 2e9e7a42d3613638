//! Background pull that only runs while the user is idle.
//!
//! A check fires on a timer. If the user has been inactive long enough and
//! nothing in the foreground is busy, a full pull runs and the next check is
//! scheduled after the steady-state interval; otherwise the check backs off
//! for a shorter period and tries again.

use super::engine::{PullSummary, SyncEngine};
use crate::config::SyncConfig;
use crate::error::SyncError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct Activity {
    origin: Instant,
    /// Millis since `origin` of the last observed input.
    last_input_ms: AtomicU64,
    busy: AtomicUsize,
}

/// Coarse user-activity signal plus a count of in-flight foreground work.
#[derive(Clone)]
pub struct ActivityMonitor {
    inner: Arc<Activity>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Activity {
                origin: Instant::now(),
                last_input_ms: AtomicU64::new(0),
                busy: AtomicUsize::new(0),
            }),
        }
    }

    /// Call on any input, click, keypress or pointer move.
    pub fn record_activity(&self) {
        let ms = self.inner.origin.elapsed().as_millis() as u64;
        self.inner.last_input_ms.store(ms, Ordering::SeqCst);
    }

    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.inner.last_input_ms.load(Ordering::SeqCst));
        self.inner.origin.elapsed().saturating_sub(last)
    }

    /// Mark foreground work (generation, upload, ...) as in flight until the
    /// guard is dropped.
    pub fn begin_busy(&self) -> BusyGuard {
        self.inner.busy.fetch_add(1, Ordering::SeqCst);
        BusyGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst) > 0
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BusyGuard {
    inner: Arc<Activity>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.busy.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
pub trait PullTarget: Send + Sync {
    async fn pull(&self) -> Result<PullSummary, SyncError>;
}

#[async_trait]
impl PullTarget for SyncEngine {
    async fn pull(&self) -> Result<PullSummary, SyncError> {
        SyncEngine::pull(self).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdlePullConfig {
    /// Minimum inactivity before a pull is allowed.
    pub idle_threshold: Duration,
    /// Delay before the first check.
    pub first_check: Duration,
    /// Delay after a check that could not pull.
    pub backoff: Duration,
    /// Delay after a check that pulled.
    pub interval: Duration,
}

impl Default for IdlePullConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(30),
            first_check: Duration::from_secs(30),
            backoff: Duration::from_secs(120),
            interval: Duration::from_secs(300),
        }
    }
}

impl From<&SyncConfig> for IdlePullConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            idle_threshold: Duration::from_millis(config.idle_threshold_ms),
            first_check: Duration::from_millis(config.idle_threshold_ms),
            backoff: Duration::from_millis(config.idle_backoff_ms),
            interval: Duration::from_millis(config.idle_interval_ms),
        }
    }
}

/// Handle to the idle pull loop. Dropping it stops the loop.
pub struct IdlePuller {
    refreshed: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl IdlePuller {
    pub fn spawn<P>(target: Arc<P>, monitor: ActivityMonitor, config: IdlePullConfig) -> Self
    where
        P: PullTarget + ?Sized + 'static,
    {
        let (tx, refreshed) = watch::channel(0);
        let task = tokio::spawn(async move {
            let mut wait = config.first_check;
            loop {
                tokio::time::sleep(wait).await;

                if monitor.is_busy() || monitor.idle_for() < config.idle_threshold {
                    debug!(
                        "Skipping idle pull (busy={}, idle {:?})",
                        monitor.is_busy(),
                        monitor.idle_for()
                    );
                    wait = config.backoff;
                    continue;
                }

                match target.pull().await {
                    Ok(summary) => {
                        info!("Idle pull complete: {:?}", summary);
                        tx.send_modify(|generation| *generation += 1);
                    }
                    Err(e) => warn!("Idle pull failed: {}", e),
                }
                wait = config.interval;
            }
        });
        Self { refreshed, task }
    }

    /// Changes after every successful pull; views reload their state on it.
    pub fn subscribe_refresh(&self) -> watch::Receiver<u64> {
        self.refreshed.clone()
    }

    /// Number of successful pulls so far.
    pub fn pulls_completed(&self) -> u64 {
        *self.refreshed.borrow()
    }
}

impl Drop for IdlePuller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
