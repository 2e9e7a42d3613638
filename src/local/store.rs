//! On-device store: one redb table per entity kind plus a string-keyed
//! settings table.

use crate::entity::{Inspiration, Project, PromptSet, ToolBlob};
use crate::error::StoreError;
use crate::module::Module;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

type JsonTable = TableDefinition<'static, &'static str, &'static str>;

const PROJECTS: JsonTable = TableDefinition::new("projects");
const INSPIRATIONS: JsonTable = TableDefinition::new("inspirations");
const TOOLS: JsonTable = TableDefinition::new("tools");
const SETTINGS: JsonTable = TableDefinition::new("settings");

const PROMPTS_KEY: &str = "prompts";

fn pending_delete_key(module: Module) -> String {
    format!("sync.pending_delete.{}", module.as_str())
}

pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Open (or create) the store at `path`.
    ///
    /// redb holds an exclusive lock on the file, so a second process opening
    /// the same path fails here instead of racing writes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        let txn = db.begin_write()?;
        for table in [PROJECTS, INSPIRATIONS, TOOLS, SETTINGS] {
            txn.open_table(table)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    // --- projects ---

    /// Save a project, stamping `updatedAt` with `now` (epoch millis).
    pub fn put_project(&self, mut project: Project, now: i64) -> Result<Project, StoreError> {
        project.updated_at = now;
        self.put_json(PROJECTS, &project.id, &project)?;
        Ok(project)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        self.get_json(PROJECTS, id)
    }

    /// All projects, most recently updated first.
    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self.list_json(PROJECTS)?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    pub fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        self.remove(PROJECTS, id)
    }

    // --- inspirations ---

    pub fn put_inspiration(&self, inspiration: &Inspiration) -> Result<(), StoreError> {
        self.put_json(INSPIRATIONS, &inspiration.id, inspiration)
    }

    pub fn get_inspiration(&self, id: &str) -> Result<Option<Inspiration>, StoreError> {
        self.get_json(INSPIRATIONS, id)
    }

    /// All inspirations, newest first.
    pub fn list_inspirations(&self) -> Result<Vec<Inspiration>, StoreError> {
        let mut items: Vec<Inspiration> = self.list_json(INSPIRATIONS)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn delete_inspiration(&self, id: &str) -> Result<bool, StoreError> {
        self.remove(INSPIRATIONS, id)
    }

    // --- tools ---

    pub fn put_tool(&self, tool: &ToolBlob) -> Result<(), StoreError> {
        self.put_json(TOOLS, &tool.id, tool)
    }

    pub fn get_tool(&self, id: &str) -> Result<Option<ToolBlob>, StoreError> {
        self.get_json(TOOLS, id)
    }

    pub fn list_tools(&self) -> Result<Vec<ToolBlob>, StoreError> {
        self.list_json(TOOLS)
    }

    pub fn delete_tool(&self, id: &str) -> Result<bool, StoreError> {
        self.remove(TOOLS, id)
    }

    // --- prompts & settings ---

    /// Stored prompts, or the compiled-in defaults if none were ever saved.
    pub fn get_prompts(&self) -> Result<PromptSet, StoreError> {
        Ok(self
            .get_json(SETTINGS, PROMPTS_KEY)?
            .unwrap_or_else(PromptSet::defaults))
    }

    pub fn put_prompts(&self, prompts: &PromptSet) -> Result<(), StoreError> {
        self.put_json(SETTINGS, PROMPTS_KEY, prompts)
    }

    /// Overwrite the given modules from a remote snapshot in one transaction,
    /// so a failed write leaves every module as it was.
    pub fn apply_snapshot(
        &self,
        projects: Option<&[Project]>,
        inspirations: Option<&[Inspiration]>,
        tools: Option<&[ToolBlob]>,
        prompts: Option<&PromptSet>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            if let Some(projects) = projects {
                let mut table = txn.open_table(PROJECTS)?;
                for project in projects {
                    table.insert(project.id.as_str(), serde_json::to_string(project)?.as_str())?;
                }
            }
            if let Some(items) = inspirations {
                let mut table = txn.open_table(INSPIRATIONS)?;
                for item in items {
                    table.insert(item.id.as_str(), serde_json::to_string(item)?.as_str())?;
                }
            }
            if let Some(tools) = tools {
                let mut table = txn.open_table(TOOLS)?;
                for tool in tools {
                    table.insert(tool.id.as_str(), serde_json::to_string(tool)?.as_str())?;
                }
            }
            if let Some(prompts) = prompts {
                let mut table = txn.open_table(SETTINGS)?;
                table.insert(PROMPTS_KEY, serde_json::to_string(prompts)?.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Ids deleted locally whose remote delete has not been confirmed yet.
    pub fn pending_deletes(&self, module: Module) -> Result<Vec<String>, StoreError> {
        Ok(self
            .get_json(SETTINGS, &pending_delete_key(module))?
            .unwrap_or_default())
    }

    pub fn add_pending_delete(&self, module: Module, id: &str) -> Result<(), StoreError> {
        let mut ids = self.pending_deletes(module)?;
        if !ids.iter().any(|pending| pending == id) {
            ids.push(id.to_string());
        }
        self.set_pending_deletes(module, &ids)
    }

    pub fn set_pending_deletes(&self, module: Module, ids: &[String]) -> Result<(), StoreError> {
        let key = pending_delete_key(module);
        if ids.is_empty() {
            self.remove(SETTINGS, &key)?;
            return Ok(());
        }
        self.put_json(SETTINGS, &key, &ids)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        let value = table.get(key)?.map(|v| v.value().to_string());
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    // --- helpers ---

    fn put_json<T: Serialize + ?Sized>(
        &self,
        table: JsonTable,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(table)?;
            table.insert(key, json.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let Some(raw) = table.get(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(raw.value()).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    fn list_json<T: DeserializeOwned>(&self, table: JsonTable) -> Result<Vec<T>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let item = serde_json::from_str(value.value()).map_err(|source| StoreError::Corrupt {
                key: key.value().to_string(),
                source,
            })?;
            out.push(item);
        }
        Ok(out)
    }

    fn remove(&self, table: JsonTable, key: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(table)?;
            let removed = table.remove(key)?;
            removed.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }
}
