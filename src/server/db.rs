//! Server-side tables: entity rows keyed by id, a settings row for prompts,
//! and binary objects keyed by path.

use crate::entity::{Inspiration, Project, PromptSet, ToolBlob};
use crate::error::StoreError;
use crate::remote::{SyncPayload, SyncSnapshot};
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
const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");
const BLOB_TYPES: JsonTable = TableDefinition::new("blob_types");

const PROMPTS_KEY: &str = "prompts";

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct RemoteDb {
    db: Database,
}

fn upsert_rows<T: Serialize>(
    txn: &redb::WriteTransaction,
    table: JsonTable,
    rows: &[T],
    id: impl Fn(&T) -> &str,
) -> Result<(), StoreError> {
    let mut table = txn.open_table(table)?;
    for row in rows {
        table.insert(id(row), serde_json::to_string(row)?.as_str())?;
    }
    Ok(())
}

impl RemoteDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Database::create(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Database::builder().create_with_backend(InMemoryBackend::new())?)
    }

    fn init(db: Database) -> Result<Self, StoreError> {
        let txn = db.begin_write()?;
        for table in [PROJECTS, INSPIRATIONS, TOOLS, SETTINGS, BLOB_TYPES] {
            txn.open_table(table)?;
        }
        txn.open_table(BLOBS)?;
        txn.commit()?;
        Ok(Self { db })
    }

    /// Insert-or-update every record present in `payload`, in one transaction.
    pub fn upsert(&self, payload: &SyncPayload) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        if let Some(projects) = &payload.projects {
            upsert_rows(&txn, PROJECTS, projects, |p: &Project| p.id.as_str())?;
        }
        if let Some(items) = &payload.inspirations {
            upsert_rows(&txn, INSPIRATIONS, items, |i: &Inspiration| i.id.as_str())?;
        }
        if let Some(tools) = &payload.tools {
            upsert_rows(&txn, TOOLS, tools, |t: &ToolBlob| t.id.as_str())?;
        }
        if let Some(prompts) = &payload.prompts {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(PROMPTS_KEY, serde_json::to_string(prompts)?.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<SyncSnapshot, StoreError> {
        Ok(SyncSnapshot {
            projects: self.list(PROJECTS)?,
            inspirations: self.list(INSPIRATIONS)?,
            prompts: self.get::<PromptSet>(SETTINGS, PROMPTS_KEY)?,
            tools: self.list(TOOLS)?,
        })
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        self.get(PROJECTS, id)
    }

    pub fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        self.remove(PROJECTS, id)
    }

    pub fn delete_inspiration(&self, id: &str) -> Result<bool, StoreError> {
        self.remove(INSPIRATIONS, id)
    }

    pub fn get_tool(&self, id: &str) -> Result<Option<ToolBlob>, StoreError> {
        self.get(TOOLS, id)
    }

    pub fn put_blob(&self, key: &str, content_type: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut blobs = txn.open_table(BLOBS)?;
            blobs.insert(key, bytes)?;
            let mut types = txn.open_table(BLOB_TYPES)?;
            types.insert(key, content_type)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_blob(&self, key: &str) -> Result<Option<Blob>, StoreError> {
        let txn = self.db.begin_read()?;
        let blobs = txn.open_table(BLOBS)?;
        let Some(bytes) = blobs.get(key)? else {
            return Ok(None);
        };
        let types = txn.open_table(BLOB_TYPES)?;
        let content_type = types
            .get(key)?
            .map(|v| v.value().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Some(Blob {
            content_type,
            bytes: bytes.value().to_vec(),
        }))
    }

    pub fn delete_blob(&self, key: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut blobs = txn.open_table(BLOBS)?;
            let removed = blobs.remove(key)?;
            let existed = removed.is_some();
            drop(removed);
            let mut types = txn.open_table(BLOB_TYPES)?;
            types.remove(key)?;
            existed
        };
        txn.commit()?;
        Ok(existed)
    }

    fn get<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> Result<Option<T>, StoreError> {
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

    fn list<T: DeserializeOwned>(&self, table: JsonTable) -> Result<Vec<T>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            out.push(
                serde_json::from_str(value.value()).map_err(|source| StoreError::Corrupt {
                    key: key.value().to_string(),
                    source,
                })?,
            );
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
