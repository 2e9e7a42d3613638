//! Local-first persistence and sync for a video-production workspace.
//!
//! Every edit lands in a local redb store first and is pushed to a remote
//! store per module (projects, inspirations, prompts, tools). A background
//! pull refreshes local state while the user is idle.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod local;
pub mod media;
pub mod module;
pub mod remote;
pub mod server;
pub mod sync;

use axum::{routing::get, Router};
use error::StoreError;
use server::RemoteDb;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use module::Module;

#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// redb file for the remote store; in-memory when unset.
    pub database: Option<PathBuf>,
}

/// Remote store API. The database is in-memory unless `config.database` is set.
pub fn create_router_with_config(config: &RouterConfig) -> Result<Router, StoreError> {
    let db = match &config.database {
        Some(path) => RemoteDb::open(path)?,
        None => RemoteDb::in_memory()?,
    };
    Ok(create_router_with_db(Arc::new(db)))
}

pub fn create_router_with_db(db: Arc<RemoteDb>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest(server::API_PREFIX, server::router(db))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
