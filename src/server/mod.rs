//! Reference implementation of the remote store: an axum API over redb.

pub mod api;
mod db;
mod range;

pub use api::{router, ApiState, API_PREFIX};
pub use db::{Blob, RemoteDb};
pub use range::{parse_range, ByteRange};
