use crate::module::Module;

/// Failure of a local redb operation or of (de)serializing a stored record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

macro_rules! store_error_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(e: $ty) -> Self {
                    StoreError::Database(e.into())
                }
            }
        )*
    };
}

store_error_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Errors surfaced by push, pull and the auto-save/auto-pull loops.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("upload failed for {module}: {cause}")]
    UploadFailed { module: Module, cause: String },
    #[error("pull failed: {cause}")]
    PullFailed { cause: String },
    #[error("local write failed for {module}: {cause}")]
    StorageWriteFailed { module: Module, cause: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("invalid inline data: {0}")]
    InvalidInlineData(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

impl SyncError {
    /// Re-tag a transport failure as an upload failure for `module`.
    pub fn upload(module: Module, cause: impl std::fmt::Display) -> Self {
        SyncError::UploadFailed {
            module,
            cause: cause.to_string(),
        }
    }

    /// Re-tag a transport failure as a pull failure.
    pub fn pull(cause: impl std::fmt::Display) -> Self {
        SyncError::PullFailed {
            cause: cause.to_string(),
        }
    }
}
