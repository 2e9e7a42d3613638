//! Debounced auto-save for one editable view.
//!
//! Every edit re-arms a quiet-period timer. When the timer runs out with no
//! further edit, the latest value is written locally and its module pushed.
//! The task is owned by the [`AutoSave`] handle and aborted when the handle
//! is dropped, so no timer outlives the view.

use super::engine::SyncEngine;
use super::state::Clock;
use super::status::SyncStatus;
use crate::entity::{Inspiration, Project, PromptSet, ToolBlob};
use crate::error::SyncError;
use crate::module::Module;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(8);

/// Where a settled edit goes.
#[async_trait]
pub trait SaveTarget<T>: Send + Sync {
    async fn save(&self, value: T) -> Result<(), SyncError>;
}

#[async_trait]
impl SaveTarget<Project> for SyncEngine {
    async fn save(&self, project: Project) -> Result<(), SyncError> {
        self.save_project(project)?;
        self.push_module(Module::Projects).await?;
        Ok(())
    }
}

#[async_trait]
impl SaveTarget<Inspiration> for SyncEngine {
    async fn save(&self, inspiration: Inspiration) -> Result<(), SyncError> {
        self.save_inspiration(&inspiration)?;
        self.push_module(Module::Inspirations).await?;
        Ok(())
    }
}

#[async_trait]
impl SaveTarget<ToolBlob> for SyncEngine {
    async fn save(&self, tool: ToolBlob) -> Result<(), SyncError> {
        self.save_tool(&tool)?;
        self.push_module(Module::Tools).await?;
        Ok(())
    }
}

#[async_trait]
impl SaveTarget<PromptSet> for SyncEngine {
    async fn save(&self, prompts: PromptSet) -> Result<(), SyncError> {
        self.save_prompts(&prompts)?;
        self.push_module(Module::Prompts).await?;
        Ok(())
    }
}

enum Command<T> {
    Edit(T),
    Flush(oneshot::Sender<Option<Result<(), SyncError>>>),
}

pub struct AutoSave<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    status: watch::Receiver<SyncStatus>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> AutoSave<T> {
    /// Start the save loop. `clock` stamps the `Synced` status.
    pub fn spawn<S>(target: Arc<S>, quiet: Duration, clock: Arc<dyn Clock>) -> Self
    where
        S: SaveTarget<T> + ?Sized + 'static,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SyncStatus::Idle);
        let task = tokio::spawn(run(target, quiet, clock, rx, status_tx));
        Self {
            commands,
            status,
            task,
        }
    }

    /// Record an edit; restarts the quiet period. Returns false if the
    /// save loop has already stopped.
    pub fn edit(&self, value: T) -> bool {
        self.commands.send(Command::Edit(value)).is_ok()
    }

    /// Save the pending edit now, if any, and return its outcome.
    pub async fn flush(&self) -> Option<Result<(), SyncError>> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(Command::Flush(reply)).ok()?;
        rx.await.ok().flatten()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }
}

impl<T> Drop for AutoSave<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, S>(
    target: Arc<S>,
    quiet: Duration,
    clock: Arc<dyn Clock>,
    mut commands: mpsc::UnboundedReceiver<Command<T>>,
    status: watch::Sender<SyncStatus>,
) where
    T: Send + 'static,
    S: SaveTarget<T> + ?Sized,
{
    let mut pending: Option<(T, Instant)> = None;
    loop {
        let due = pending.as_ref().map(|(_, due)| *due);
        let command = match due {
            None => commands.recv().await,
            Some(due) => tokio::select! {
                command = commands.recv() => command,
                _ = tokio::time::sleep_until(due) => {
                    if let Some((value, _)) = pending.take() {
                        // Outcome is reported through the status channel.
                        let _ = save(target.as_ref(), value, clock.as_ref(), &status).await;
                    }
                    continue;
                }
            },
        };

        match command {
            Some(Command::Edit(value)) => {
                pending = Some((value, Instant::now() + quiet));
                status.send_replace(SyncStatus::Pending {
                    due_in_ms: quiet.as_millis() as u64,
                });
            }
            Some(Command::Flush(reply)) => {
                let outcome = match pending.take() {
                    Some((value, _)) => Some(save(target.as_ref(), value, clock.as_ref(), &status).await),
                    None => None,
                };
                let _ = reply.send(outcome);
            }
            None => {
                if pending.is_some() {
                    debug!("Auto-save handle dropped with an unsaved edit");
                }
                return;
            }
        }
    }
}

async fn save<T, S>(
    target: &S,
    value: T,
    clock: &dyn Clock,
    status: &watch::Sender<SyncStatus>,
) -> Result<(), SyncError>
where
    S: SaveTarget<T> + ?Sized,
{
    status.send_replace(SyncStatus::Saving);
    match target.save(value).await {
        Ok(()) => {
            let at = chrono::DateTime::from_timestamp_millis(clock.now_millis()).unwrap_or_default();
            status.send_replace(SyncStatus::Synced { at });
            Ok(())
        }
        Err(e) => {
            warn!("Auto-save failed: {}", e);
            status.send_replace(SyncStatus::Error {
                message: e.to_string(),
            });
            Err(e)
        }
    }
}
