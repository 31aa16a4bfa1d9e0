//! Work collaborators invoked once per tick.

use std::collections::BTreeMap;
use std::process::Command;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::config::QueueDef;
use crate::lifecycle::Tick;

/// Queues a worker knows about, split by whether they can be run directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredQueues {
    pub active: Vec<String>,
    pub passive: Vec<String>,
}

/// The unit of scheduled work driven by the run loop.
pub trait Worker {
    fn tick(&mut self, tick: &Tick<'_>) -> anyhow::Result<()>;

    /// Queues to record in the run snapshot and offer in the queue menu.
    fn discovered_queues(&self) -> DiscoveredQueues {
        DiscoveredQueues::default()
    }
}

impl<F> Worker for F
where
    F: FnMut(&Tick<'_>) -> anyhow::Result<()>,
{
    fn tick(&mut self, tick: &Tick<'_>) -> anyhow::Result<()> {
        self(tick)
    }
}

/// Runs the configured command of the ticking queue as a child process.
///
/// The child sees `LANEKEEPER_QUEUE` and `LANEKEEPER_FIRST_TICK`. A non-zero
/// exit status fails the tick.
#[derive(Debug, Clone, Default)]
pub struct CommandWorker {
    queues: BTreeMap<String, QueueDef>,
}

impl CommandWorker {
    pub fn new(queues: BTreeMap<String, QueueDef>) -> Self {
        Self { queues }
    }
}

impl Worker for CommandWorker {
    fn tick(&mut self, tick: &Tick<'_>) -> anyhow::Result<()> {
        if tick.first {
            let discovered = self.discovered_queues();
            info!(
                queue = tick.queue,
                active = ?discovered.active,
                passive = ?discovered.passive,
                "Known queues"
            );
        }

        let Some(def) = self.queues.get(tick.queue) else {
            bail!("unknown queue '{}'", tick.queue);
        };
        let Some((program, args)) = def.command.split_first() else {
            bail!("queue '{}' has an empty command", tick.queue);
        };

        debug!(queue = tick.queue, tick = tick.index, program = %program, "Running command");
        let status = Command::new(program)
            .args(args)
            .env("LANEKEEPER_QUEUE", tick.queue)
            .env("LANEKEEPER_FIRST_TICK", if tick.first { "1" } else { "0" })
            .status()
            .with_context(|| format!("failed to spawn '{program}'"))?;

        if !status.success() {
            bail!("'{program}' exited with {status}");
        }
        Ok(())
    }

    fn discovered_queues(&self) -> DiscoveredQueues {
        let mut discovered = DiscoveredQueues::default();
        for (name, def) in &self.queues {
            if def.passive {
                discovered.passive.push(name.clone());
            } else {
                discovered.active.push(name.clone());
            }
        }
        discovered
    }
}
