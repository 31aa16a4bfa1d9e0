use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{ConfigMode, ConfigSnapshot, Settings, StartupMode};
use crate::error::LifecycleError;
use crate::lifecycle::handlers::{ErrorHandler, ExitHandler, HandlerRegistry};
use crate::lifecycle::release::ResourceReleaser;
use crate::lifecycle::run_loop::{
    panic_message, LoopReport, RunLoopConfig, ScheduledRunLoop, TickError,
};
use crate::logging;
use crate::shutdown::StopSignal;
use crate::worker::{DiscoveredQueues, Worker};

/// Process lifecycle state machine.
///
/// NotInitialized → Initialized → Running → Finished. Nothing moves backwards;
/// a finished controller never runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    NotInitialized,
    Initialized,
    Running,
    Finished,
}

impl LifecycleState {
    /// True once `start()` has been entered.
    pub fn has_started(&self) -> bool {
        matches!(self, Self::Running | Self::Finished)
    }
}

/// The error that escaped the entry point, if any.
///
/// Only used to decide whether the exit hook may auto-start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtRecord {
    pub message: String,
    pub panicked: bool,
}

impl UncaughtRecord {
    fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            panicked: false,
        }
    }

    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: panic_message(payload),
            panicked: true,
        }
    }
}

/// Result of dispatching one tick failure to the error handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub invoked: usize,
    pub failed: usize,
}

/// Owns the process lifecycle: decides once whether the queue runs, drives
/// the run loop, then releases hubs and runs exit handlers.
pub struct LifecycleController {
    settings: Settings,
    state: LifecycleState,
    worker: Box<dyn Worker>,
    error_handlers: HandlerRegistry<ErrorHandler>,
    exit_handlers: HandlerRegistry<ExitHandler>,
    releaser: ResourceReleaser,
    snapshot: Option<Box<dyn ConfigSnapshot>>,
    uncaught: Option<UncaughtRecord>,
    stop: StopSignal,
    last_report: Option<LoopReport<HandlerOutcome>>,
}

impl LifecycleController {
    pub fn new(settings: Settings, worker: impl Worker + 'static) -> Self {
        Self {
            settings,
            state: LifecycleState::NotInitialized,
            worker: Box::new(worker),
            error_handlers: HandlerRegistry::new("error"),
            exit_handlers: HandlerRegistry::new("exit"),
            releaser: ResourceReleaser::new(),
            snapshot: None,
            uncaught: None,
            stop: StopSignal::new(),
            last_report: None,
        }
    }

    /// Persist a run snapshot through `snapshot` when the process exits.
    pub fn with_snapshot(mut self, snapshot: impl ConfigSnapshot + 'static) -> Self {
        self.snapshot = Some(Box::new(snapshot));
        self
    }

    pub fn with_releaser(mut self, releaser: ResourceReleaser) -> Self {
        self.releaser = releaser;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle that stops the run loop before its next tick.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn uncaught(&self) -> Option<&UncaughtRecord> {
        self.uncaught.as_ref()
    }

    pub fn last_report(&self) -> Option<&LoopReport<HandlerOutcome>> {
        self.last_report.as_ref()
    }

    pub fn releaser_mut(&mut self) -> &mut ResourceReleaser {
        &mut self.releaser
    }

    /// Queues the worker knows about, as reported to the snapshot.
    pub fn discovered_queues(&self) -> DiscoveredQueues {
        self.worker.discovered_queues()
    }

    /// Set the queue to run. Has no effect once started.
    pub fn set_queue(&mut self, queue: impl Into<String>) {
        self.settings.set_queue(queue);
    }

    /// Turn `start()` into a no-op for the rest of this process.
    pub fn disable_startup(&mut self) {
        self.settings.framework.startup = StartupMode::Disabled;
    }

    /// Install logging. Safe to call more than once.
    pub fn initialize(&mut self) {
        if self.state != LifecycleState::NotInitialized {
            return;
        }

        logging::init_tracing(self.settings.framework.testing);
        self.state = LifecycleState::Initialized;
        debug!(
            startup = ?self.settings.framework.startup,
            config = ?self.settings.framework.config,
            "Lifecycle initialized"
        );
    }

    /// Register a handler for failed ticks. Must happen before `start()`.
    pub fn register_error_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&TickError) -> anyhow::Result<()> + 'static,
    {
        self.error_handlers.register(Box::new(handler));
    }

    /// Register a handler run after the loop and resource release.
    pub fn register_exit_handler<F>(&mut self, handler: F)
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.exit_handlers.register(Box::new(handler));
    }

    /// Run the queue to completion. Only the first call does anything.
    ///
    /// Blocks until the run loop ends, then releases hubs and runs exit
    /// handlers. Fails with [`LifecycleError::MissingConfiguration`] when no
    /// queue is configured; the controller is finished either way.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.settings.framework.startup == StartupMode::Disabled {
            debug!("Startup disabled, not starting");
            return Ok(());
        }
        if self.state.has_started() {
            debug!(state = ?self.state, "Already started");
            return Ok(());
        }

        self.initialize();
        self.state = LifecycleState::Running;

        let Some(queue) = self.settings.queue().map(str::to_string) else {
            self.state = LifecycleState::Finished;
            return Err(LifecycleError::MissingConfiguration("queue identifier"));
        };

        let config = RunLoopConfig::from(&self.settings.run);
        info!(
            queue = %queue,
            run_once = config.run_once,
            sleep_min = config.sleep_min,
            sleep_max = config.sleep_max,
            "Starting run loop"
        );

        let mut run_loop = ScheduledRunLoop::new(config, self.stop.clone());
        let worker = &mut self.worker;
        let handlers = &mut self.error_handlers;
        let report = run_loop.run(
            &queue,
            |tick| worker.tick(tick),
            |error| {
                let failed = handlers.notify(error);
                Some(HandlerOutcome {
                    invoked: handlers.len(),
                    failed,
                })
            },
        );

        let released = self.releaser.release_all();
        debug!(
            cleared = ?released.cleared,
            skipped = ?released.skipped,
            failed = ?released.failed,
            "Resource hubs released"
        );

        let failed_exit = self.exit_handlers.notify();
        if failed_exit > 0 {
            debug!(failed = failed_exit, "Some exit handlers failed");
        }

        info!(
            queue = %queue,
            ticks = report.ticks,
            failures = report.failures,
            stop_reason = ?report.stop_reason,
            "Run finished"
        );
        self.last_report = Some(report);
        self.state = LifecycleState::Finished;
        Ok(())
    }

    /// How long to wait before exiting the process, if the run asked for it.
    pub fn exit_after(&self) -> Option<Duration> {
        self.last_report.as_ref().and_then(|report| report.exit_after)
    }

    /// Write the run snapshot unless config writing is disabled.
    pub fn persist_snapshot(&mut self) -> Result<(), LifecycleError> {
        let mode = self.settings.framework.config;
        if mode == ConfigMode::Disabled {
            return Ok(());
        }
        let Some(snapshot) = self.snapshot.as_mut() else {
            return Ok(());
        };

        if mode != ConfigMode::Discrete {
            if let Some(queue) = self.settings.queue() {
                snapshot.write_last_run(queue);
            }
        }

        let discovered = self.worker.discovered_queues();
        snapshot.write_discovered_queues(&discovered.active, &discovered.passive);
        snapshot.save()?;
        Ok(())
    }

    /// Whether the exit hook would start the run loop right now.
    pub fn should_auto_start(&self) -> bool {
        self.settings.framework.startup == StartupMode::AutoStart
            && !self.state.has_started()
            && (self.uncaught.is_none() || self.settings.framework.start_with_error)
    }

    /// Exit hook: persist the snapshot, then auto-start if eligible.
    pub fn on_process_exit(&mut self) {
        if let Err(err) = self.persist_snapshot() {
            warn!(error = %err, "Failed to persist run snapshot");
        }

        if !self.should_auto_start() {
            return;
        }

        info!("Auto-starting at process exit");
        if let Err(err) = self.start() {
            error!(error = %err, "Auto-start failed");
        }
    }

    /// Run `body`, recording an error or panic that escapes it.
    ///
    /// Errors are returned to the caller for reporting; panics keep
    /// unwinding after the default panic hook has reported them.
    pub fn run_and_capture<F>(&mut self, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Self) -> anyhow::Result<()>,
    {
        match catch_unwind(AssertUnwindSafe(|| body(self))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(error = %format!("{err:#}"), "Entry point failed");
                self.uncaught = Some(UncaughtRecord::from_error(&err));
                Err(err)
            }
            Err(payload) => {
                self.uncaught = Some(UncaughtRecord::from_panic(payload.as_ref()));
                resume_unwind(payload)
            }
        }
    }
}

/// Run the entry-point `body` with the exit hook guaranteed to fire.
///
/// The hook runs on normal return, on error, and while unwinding from a
/// panic.
pub fn run_process<F>(controller: &mut LifecycleController, body: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut LifecycleController) -> anyhow::Result<()>,
{
    let mut guard = scopeguard::guard(controller, |controller| controller.on_process_exit());
    let result = guard.run_and_capture(body);
    drop(guard);
    result
}
