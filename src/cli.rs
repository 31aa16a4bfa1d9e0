use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{Settings, SnapshotStore};
use crate::lifecycle::LifecycleController;
use crate::ui::backend::CrosstermMenuBackend;
use crate::ui::menu::choose_queue;
use crate::worker::CommandWorker;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "lanekeeper",
    version,
    about = "Run one scheduled queue per process, started explicitly or at exit"
)]
pub struct Cli {
    /// Path to the project configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run QUEUE now, or pick a queue from a menu when omitted
    Run {
        /// Queue identifier
        queue: Option<String>,
    },
    /// List the queues defined in the configuration
    Queues,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::config_path)
    }
}

/// Wire the default collaborators: a command worker over the configured
/// queues and a snapshot next to the config file.
pub fn build_controller(settings: Settings, config_path: &Path) -> Result<LifecycleController> {
    let snapshot_path = Settings::snapshot_path(config_path);
    let snapshot = SnapshotStore::open(&snapshot_path)
        .with_context(|| format!("failed to open snapshot {}", snapshot_path.display()))?;
    let worker = CommandWorker::new(settings.queues.clone());

    Ok(LifecycleController::new(settings, worker).with_snapshot(snapshot))
}

/// Entry-point body. Without a subcommand nothing happens here and the exit
/// hook decides whether to auto-start.
pub fn dispatch(
    command: Option<Command>,
    snapshot_path: &Path,
    controller: &mut LifecycleController,
) -> Result<()> {
    match command {
        None => Ok(()),
        Some(Command::Run { queue: Some(queue) }) if !queue.trim().is_empty() => {
            controller.set_queue(queue.trim());
            controller.start()?;
            Ok(())
        }
        Some(Command::Run { .. }) => run_from_menu(snapshot_path, controller),
        Some(Command::Queues) => {
            controller.disable_startup();
            let discovered = controller.discovered_queues();
            for queue in &discovered.active {
                println!("{queue}");
            }
            for queue in &discovered.passive {
                println!("{queue} (passive)");
            }
            Ok(())
        }
    }
}

fn run_from_menu(snapshot_path: &Path, controller: &mut LifecycleController) -> Result<()> {
    let entries = menu_entries(snapshot_path, controller)?;

    let choice = {
        let mut backend = CrosstermMenuBackend::open().context("failed to open terminal")?;
        let choice = choose_queue(&entries, &mut backend);
        backend.restore();
        choice?
    };

    match choice {
        Some(queue) => {
            controller.set_queue(queue);
            controller.start()?;
        }
        None => {
            info!("No queue selected");
            controller.disable_startup();
        }
    }
    Ok(())
}

/// Discover queues, persist the snapshot, then list the active queues as
/// `(queue, preselected)` with the last-run queue preselected.
pub fn menu_entries(
    snapshot_path: &Path,
    controller: &mut LifecycleController,
) -> Result<Vec<(String, bool)>> {
    let discovered = controller.discovered_queues();
    if discovered.active.is_empty() {
        bail!("No active queues configured");
    }

    if let Err(err) = controller.persist_snapshot() {
        warn!(error = %err, "Failed to persist run snapshot");
    }

    let last_run = SnapshotStore::open(snapshot_path)
        .ok()
        .and_then(|store| store.last_run_queue().map(str::to_string));
    Ok(discovered
        .active
        .into_iter()
        .map(|queue| {
            let preselected = last_run.as_deref() == Some(queue.as_str());
            (queue, preselected)
        })
        .collect())
}
