//! Push and pull between the local store and the remote store.
//!
//! Consistency model: a push sends the full local snapshot of one module and
//! the remote overwrites matching ids; a pull overwrites local records with
//! whatever the remote returned. There is no per-field merge and no conflict
//! detection, except that pulled prompts are layered over the compiled-in
//! defaults.

use super::offload;
use super::sanitize::sanitize_project;
use super::tracker::SyncTracker;
use crate::entity::{Inspiration, Project, PromptSet, ToolBlob};
use crate::error::{StoreError, SyncError};
use crate::local::LocalStore;
use crate::module::Module;
use crate::remote::{PushAck, RemoteStore, SyncPayload};
use std::sync::Arc;
use tracing::{info, warn};

/// Counts of records written by a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub projects: usize,
    pub inspirations: usize,
    pub tools: usize,
    pub prompts: bool,
}

pub struct SyncEngine {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    tracker: SyncTracker,
}

fn write_failed(module: Module, e: StoreError) -> SyncError {
    SyncError::StorageWriteFailed {
        module,
        cause: e.to_string(),
    }
}

impl SyncEngine {
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>, tracker: SyncTracker) -> Self {
        Self {
            local,
            remote,
            tracker,
        }
    }

    pub fn local(&self) -> &Arc<LocalStore> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn tracker(&self) -> &SyncTracker {
        &self.tracker
    }

    pub fn unsaved_modules(&self) -> Vec<Module> {
        self.tracker.unsaved_modules()
    }

    // --- local writes ---

    pub fn save_project(&self, project: Project) -> Result<Project, SyncError> {
        let saved = self
            .local
            .put_project(project, self.tracker.now_millis())
            .map_err(|e| write_failed(Module::Projects, e))?;
        self.tracker.track_change(Module::Projects);
        Ok(saved)
    }

    pub fn save_inspiration(&self, inspiration: &Inspiration) -> Result<(), SyncError> {
        self.local
            .put_inspiration(inspiration)
            .map_err(|e| write_failed(Module::Inspirations, e))?;
        self.tracker.track_change(Module::Inspirations);
        Ok(())
    }

    pub fn save_tool(&self, tool: &ToolBlob) -> Result<(), SyncError> {
        self.local
            .put_tool(tool)
            .map_err(|e| write_failed(Module::Tools, e))?;
        self.tracker.track_change(Module::Tools);
        Ok(())
    }

    pub fn save_prompts(&self, prompts: &PromptSet) -> Result<(), SyncError> {
        self.local
            .put_prompts(prompts)
            .map_err(|e| write_failed(Module::Prompts, e))?;
        self.tracker.track_change(Module::Prompts);
        Ok(())
    }

    /// Delete locally, then remotely. A full-snapshot push never removes
    /// remote rows, so deletion needs the point endpoint.
    ///
    /// The id is queued before the remote call and only dequeued once the
    /// remote confirms. If the remote delete fails the local delete stands
    /// and the next push or pull of the module retries it.
    pub async fn delete_project(&self, id: &str) -> Result<bool, SyncError> {
        let existed = self
            .local
            .delete_project(id)
            .map_err(|e| write_failed(Module::Projects, e))?;
        self.queue_remote_delete(Module::Projects, id).await?;
        Ok(existed)
    }

    pub async fn delete_inspiration(&self, id: &str) -> Result<bool, SyncError> {
        let existed = self
            .local
            .delete_inspiration(id)
            .map_err(|e| write_failed(Module::Inspirations, e))?;
        self.queue_remote_delete(Module::Inspirations, id).await?;
        Ok(existed)
    }

    async fn queue_remote_delete(&self, module: Module, id: &str) -> Result<(), SyncError> {
        self.local
            .add_pending_delete(module, id)
            .map_err(|e| write_failed(module, e))?;
        self.tracker.track_change(module);
        self.replay_deletes(module).await?;
        Ok(())
    }

    /// Send queued remote deletes for `module`. Ids that fail stay queued.
    pub async fn replay_deletes(&self, module: Module) -> Result<usize, SyncError> {
        let pending = self.local.pending_deletes(module)?;
        if pending.is_empty() {
            return Ok(0);
        }
        for (i, id) in pending.iter().enumerate() {
            let sent = match module {
                Module::Projects => self.remote.delete_project(id).await,
                Module::Inspirations => self.remote.delete_inspiration(id).await,
                Module::Prompts | Module::Tools => Ok(()),
            };
            if let Err(e) = sent {
                self.local
                    .set_pending_deletes(module, &pending[i..])
                    .map_err(|e| write_failed(module, e))?;
                return Err(SyncError::upload(module, e));
            }
        }
        self.local
            .set_pending_deletes(module, &[])
            .map_err(|e| write_failed(module, e))?;
        info!("Replayed {} remote deletes for {}", pending.len(), module);
        Ok(pending.len())
    }

    /// Local-only: the remote has no tool delete endpoint.
    pub fn delete_tool(&self, id: &str) -> Result<bool, SyncError> {
        let existed = self
            .local
            .delete_tool(id)
            .map_err(|e| write_failed(Module::Tools, e))?;
        self.tracker.track_change(Module::Tools);
        Ok(existed)
    }

    // --- push ---

    /// Full current payload for `module`, sanitized for upload.
    pub fn snapshot(&self, module: Module) -> Result<SyncPayload, SyncError> {
        let mut payload = SyncPayload::default();
        match module {
            Module::Projects => {
                let projects = self.local.list_projects()?;
                payload.projects = Some(projects.iter().map(sanitize_project).collect());
            }
            Module::Inspirations => payload.inspirations = Some(self.local.list_inspirations()?),
            Module::Prompts => payload.prompts = Some(self.local.get_prompts()?),
            Module::Tools => payload.tools = Some(self.local.list_tools()?),
        }
        Ok(payload)
    }

    /// Push the whole module. The upload stamp only advances once the remote
    /// confirms, and only to the moment the snapshot was taken.
    pub async fn push_module(&self, module: Module) -> Result<PushAck, SyncError> {
        self.replay_deletes(module).await?;
        let taken_at = self.tracker.stamp();
        let payload = self.snapshot(module)?;
        let ack = self
            .remote
            .push(&payload)
            .await
            .map_err(|e| SyncError::upload(module, e))?;
        self.tracker.record_upload_at(module, taken_at);
        info!("Pushed {} (remote timestamp {})", module, ack.timestamp);
        Ok(ack)
    }

    /// Push every module in upload order, stopping at the first failure.
    pub async fn push_all(&self) -> Result<(), SyncError> {
        for module in Module::UPLOAD_ORDER {
            self.push_module(module).await?;
        }
        Ok(())
    }

    /// Push only modules with unpushed changes. Returns the modules pushed.
    pub async fn push_dirty(&self) -> Result<Vec<Module>, SyncError> {
        let dirty = self.tracker.unsaved_modules();
        let mut pushed = Vec::new();
        for module in Module::UPLOAD_ORDER {
            if dirty.contains(&module) {
                self.push_module(module).await?;
                pushed.push(module);
            }
        }
        Ok(pushed)
    }

    // --- pull ---

    /// Pull every module and mark all of them synced.
    ///
    /// Local edits made while the request was in flight lose their dirty bit
    /// here; callers avoid that by not pulling during foreground work.
    pub async fn pull(&self) -> Result<PullSummary, SyncError> {
        self.pull_modules(&Module::ALL).await
    }

    /// Pull, but only overwrite and reset the listed modules.
    ///
    /// Queued remote deletes for those modules are sent first; if any fails
    /// the pull is abandoned so the deleted rows cannot come back.
    pub async fn pull_modules(&self, modules: &[Module]) -> Result<PullSummary, SyncError> {
        for &module in modules {
            self.replay_deletes(module).await.map_err(SyncError::pull)?;
        }
        let snapshot = self.remote.pull().await.map_err(SyncError::pull)?;
        let wants = |m: Module| modules.contains(&m);

        let prompts = if wants(Module::Prompts) {
            snapshot.prompts.map(PromptSet::merged_over_defaults)
        } else {
            None
        };
        let projects = wants(Module::Projects).then_some(snapshot.projects.as_slice());
        let inspirations = wants(Module::Inspirations).then_some(snapshot.inspirations.as_slice());
        let tools = wants(Module::Tools).then_some(snapshot.tools.as_slice());

        self.local
            .apply_snapshot(projects, inspirations, tools, prompts.as_ref())
            .map_err(SyncError::pull)?;
        self.tracker.mark_synced(modules);

        let summary = PullSummary {
            projects: projects.map_or(0, <[Project]>::len),
            inspirations: inspirations.map_or(0, <[Inspiration]>::len),
            tools: tools.map_or(0, <[ToolBlob]>::len),
            prompts: prompts.is_some(),
        };
        info!("Pulled {:?}", summary);
        Ok(summary)
    }

    // --- media ---

    /// Upload a project's inline images, then save it with remote URLs.
    ///
    /// If an upload fails part way, the images already uploaded are still
    /// saved with their remote URLs before the error is returned.
    pub async fn offload_inline_images(&self, project: Project) -> Result<Project, SyncError> {
        let original = project.clone();
        let mut project = project;
        let result = offload::offload_inline_images(self.remote.as_ref(), &mut project).await;
        let saved = if project != original {
            Some(self.save_project(project)?)
        } else {
            None
        };
        match result {
            Ok(moved) => {
                info!("Offloaded {} inline images for project {}", moved, original.id);
                Ok(saved.unwrap_or(original))
            }
            Err(e) => {
                if saved.is_some() {
                    warn!("Kept partial image offload for project {}: {}", original.id, e);
                }
                Err(e)
            }
        }
    }
}
