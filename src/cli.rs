//! Command-line arguments for the binaries.

use crate::module::Module;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reelkit-server: remote store for projects, inspirations, prompts and tools
#[derive(Parser, Debug)]
#[command(name = "reelkit-server", version)]
pub struct ServerArgs {
    #[arg(long, env = "REELKIT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(short, long, env = "REELKIT_PORT", default_value_t = 8787)]
    pub port: u16,

    /// redb file to persist to; in-memory when omitted
    #[arg(long, env = "REELKIT_SERVER_DB")]
    pub database: Option<PathBuf>,
}

/// reelkit-sync: push and pull the local workspace
#[derive(Parser, Debug)]
#[command(name = "reelkit-sync", version)]
pub struct SyncArgs {
    /// JSON config file
    #[arg(short, long, env = "REELKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Remote API prefix; overrides the config file
    #[arg(long, env = "REELKIT_SERVER")]
    pub server: Option<String>,

    /// Local redb file; overrides the config file
    #[arg(long, env = "REELKIT_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SyncCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SyncCommand {
    /// List modules with unsaved changes
    Status,
    /// Push one module, or every dirty module
    Push {
        module: Option<Module>,
        /// Push every module, dirty or not
        #[arg(long, conflicts_with = "module")]
        all: bool,
    },
    /// Pull everything from the remote store
    Pull,
    /// Pull in the background whenever the workspace is idle
    Watch,
}
