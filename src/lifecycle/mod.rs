//! Process lifecycle: run loop, handler registries, resource release, and
//! the controller that ties them together.
//!
//! ```text
//! initialize ──→ start ──→ run loop ──→ release hubs ──→ exit handlers
//!                  ↑
//!   exit hook ─────┘ (auto_start, not started, no uncaught error)
//! ```

mod controller;
mod handlers;
mod release;
mod run_loop;

pub use controller::{
    run_process, HandlerOutcome, LifecycleController, LifecycleState, UncaughtRecord,
};
pub use handlers::{ErrorHandler, ExitHandler, HandlerRegistry};
pub use release::{ReleaseSummary, ResourceHub, ResourceReleaser, SingletonHub};
pub use run_loop::{
    LoopReport, Pause, RunLoopConfig, ScheduledRunLoop, StopReason, ThreadPause, Tick,
    TickDecision, TickError,
};
