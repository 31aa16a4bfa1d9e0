//! Top-level error type for the lifecycle controller.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by [`crate::lifecycle::LifecycleController`].
///
/// Per-tick failures and handler failures never show up here; they are
/// routed to the error handlers or swallowed at the call site.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A value required to start the run loop could not be resolved.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
