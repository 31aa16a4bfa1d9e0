use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Cooperative stop flag observed by the run loop between ticks.
///
/// Clones share the same flag, so a worker or a signal handler can ask the
/// loop to stop without owning it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop before its next tick.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("Stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Set the flag when the process receives SIGTERM.
    ///
    /// The loop still finishes the tick (or sleep) in progress.
    pub fn register_sigterm(&self) {
        if let Err(err) = signal_hook::flag::register(
            signal_hook::consts::SIGTERM,
            Arc::clone(&self.stopped),
        ) {
            warn!(error = %err, "Failed to register SIGTERM handler");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_stopped());
        handle.stop();
        assert!(signal.is_stopped());
    }

    #[test]
    fn stop_is_idempotent() {
        let signal = StopSignal::new();
        signal.stop();
        signal.stop();
        assert!(signal.is_stopped());
    }
}
