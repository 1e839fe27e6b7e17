//! Save Backup Agent - Main entry point
//!
//! Watches the configured save locations and keeps rotating backups of every
//! save that changes.

use anyhow::Result;
use clap::Parser;
use save_backup_agent::daemon::{instance_lock::InstanceLock, shutdown::ShutdownCoordinator};
use save_backup_agent::{utils, BackupEngine, Config, MetadataStore};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Run a single backup pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = args.config {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    let log_file = config
        .log
        .file
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty());
    utils::logger::init(log_level, log_file)?;

    info!("Starting save-backup-agent v{}", env!("CARGO_PKG_VERSION"));

    let _instance_lock = match InstanceLock::acquire(&config.agent.lock_file) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}. Terminating...", e);
            return Err(e.into());
        }
    };

    let store = MetadataStore::new(&config.agent.metadata_file);
    let set = match config.saves.seed().and_then(|seed| store.load_or_create(seed)) {
        Ok(set) => set,
        Err(e) => {
            error!("Error on getting backups data: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Watching {} location(s) under {} (metadata: {}, {} backups per save)",
        set.location_folders.len(),
        set.source_root.display(),
        store.path().display(),
        set.max_slots_per_save
    );
    if set.is_empty() {
        info!("No saves backed up yet, every save found will be backed up");
    }

    // Signals cancel the token the engine checks between attempts
    let shutdown_coordinator = ShutdownCoordinator::new();
    let token = shutdown_coordinator.token();
    let engine = BackupEngine::with_cancel(set, store, config.retry_delay(), token.clone());

    let signal_handle = tokio::spawn(async move {
        shutdown_coordinator.wait_for_signal().await;
    });

    let result = backup_loop(engine, token.clone(), config.poll_interval(), args.once).await;

    token.cancel();
    let _ = signal_handle.await;

    if let Err(e) = &result {
        error!("Backup loop stopped: {:#}", e);
    }
    result
}

/// Run passes until shutdown, waiting `poll_interval` between them.
async fn backup_loop(
    mut engine: BackupEngine,
    token: CancellationToken,
    poll_interval: Duration,
    once: bool,
) -> Result<()> {
    info!("Checking saves to make backups...");
    let mut first_pass = true;

    loop {
        // Copies are blocking file system work
        let (returned, summary) = tokio::task::spawn_blocking(move || {
            let summary = engine.run_pass();
            (engine, summary)
        })
        .await?;
        engine = returned;
        let summary = summary?;

        if summary.any_backed_up() {
            info!(
                backed_up = summary.backed_up,
                "Saves backed up successfully. Waiting for new saves changes..."
            );
        } else if first_pass {
            info!("All saves backups are up to date. Waiting for saves changes...");
        }
        first_pass = false;

        if summary.cancelled || once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = token.cancelled() => break,
        }
    }

    info!("Shutdown complete");
    Ok(())
}
