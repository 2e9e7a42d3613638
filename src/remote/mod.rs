//! Client side of the remote store.

mod http;
pub mod protocol;

use crate::error::SyncError;
use async_trait::async_trait;

pub use http::{encode_key, HttpRemote};
pub use protocol::{BlobRef, PushAck, SyncPayload, SyncSnapshot};

/// The remote collaborator the sync engine talks to.
///
/// `push` is a full-snapshot, idempotent upsert keyed by entity id; `pull`
/// returns every module in one round trip.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn push(&self, payload: &SyncPayload) -> Result<PushAck, SyncError>;

    async fn pull(&self) -> Result<SyncSnapshot, SyncError>;

    /// Store a binary object under `key`, returning its retrieval URL.
    async fn upload_blob(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<BlobRef, SyncError>;

    async fn delete_project(&self, id: &str) -> Result<(), SyncError>;

    async fn delete_inspiration(&self, id: &str) -> Result<(), SyncError>;
}
