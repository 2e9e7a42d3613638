//! reelkit-sync: inspect, push and pull the local workspace.

use clap::Parser;
use reelkit_sync::cli::{SyncArgs, SyncCommand};
use reelkit_sync::config::SyncConfig;
use reelkit_sync::local::LocalStore;
use reelkit_sync::remote::HttpRemote;
use reelkit_sync::sync::{
    ActivityMonitor, IdlePullConfig, IdlePuller, SyncEngine, SyncTracker, SystemClock,
};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = SyncArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => match SyncConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("[sync] Failed to load config {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SyncConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    if let Some(database) = &args.database {
        config.database = database.clone();
    }

    let local = match LocalStore::open(&config.database) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            // redb holds an exclusive lock, so a second instance fails here.
            tracing::error!(
                "[sync] Failed to open {:?} (is another instance running?): {}",
                config.database,
                e
            );
            std::process::exit(1);
        }
    };
    let tracker = SyncTracker::new(local.clone(), Arc::new(SystemClock));
    let remote = Arc::new(HttpRemote::new(config.server_url.clone()));
    let engine = Arc::new(SyncEngine::new(local, remote, tracker));

    tracing::debug!("[sync] Remote: {}", config.server_url);

    let result = match args.command {
        SyncCommand::Status => {
            let labels = engine.tracker().unsaved_labels();
            if labels.is_empty() {
                println!("All changes saved");
            } else {
                println!("Unsaved: {}", labels.join(", "));
            }
            Ok(())
        }
        SyncCommand::Push { module: Some(module), .. } => {
            engine.push_module(module).await.map(|_| println!("Pushed {}", module))
        }
        SyncCommand::Push { module: None, all: true } => {
            engine.push_all().await.map(|_| println!("Pushed all modules"))
        }
        SyncCommand::Push { module: None, all: false } => engine.push_dirty().await.map(|pushed| {
            if pushed.is_empty() {
                println!("Nothing to push");
            }
            for module in pushed {
                println!("Pushed {}", module);
            }
        }),
        SyncCommand::Pull => engine.pull().await.map(|summary| {
            println!(
                "Pulled {} projects, {} inspirations, {} tools{}",
                summary.projects,
                summary.inspirations,
                summary.tools,
                if summary.prompts { ", prompts" } else { "" }
            )
        }),
        SyncCommand::Watch => {
            watch(engine, IdlePullConfig::from(&config)).await;
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("[sync] {}", e);
        std::process::exit(1);
    }
}

async fn watch(engine: Arc<SyncEngine>, config: IdlePullConfig) {
    tracing::info!(
        "[sync] Watching; pulling every {:?} while idle",
        config.interval
    );
    let puller = IdlePuller::spawn(engine, ActivityMonitor::new(), config);
    let mut refreshed = puller.subscribe_refresh();

    loop {
        tokio::select! {
            changed = refreshed.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!("[sync] Pull #{} complete", *refreshed.borrow_and_update());
            }
            _ = signal::ctrl_c() => {
                tracing::info!("[sync] Received Ctrl+C, stopping");
                break;
            }
        }
    }
}
