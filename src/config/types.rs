use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration container, read from `lanekeeper.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub framework: FrameworkConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// Queues known to this project, keyed by queue identifier.
    #[serde(default)]
    pub queues: BTreeMap<String, QueueDef>,
}

/// How the controller decides to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    /// Start explicitly, or automatically when the process exits.
    #[default]
    AutoStart,
    /// Start only when `start()` is called.
    Enabled,
    /// `start()` is a no-op.
    Disabled,
}

impl StartupMode {
    /// Parse from an env value. Accepts `auto_start`, `auto-start` and `auto`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto_start" | "auto-start" | "auto" => Some(Self::AutoStart),
            "enabled" => Some(Self::Enabled),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// How much of the run snapshot is persisted at exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    /// Persist the last-run queue and the discovered queues.
    #[default]
    Enabled,
    /// Persist the discovered queues only.
    Discrete,
    /// Persist nothing.
    Disabled,
}

impl ConfigMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Some(Self::Enabled),
            "discrete" => Some(Self::Discrete),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Startup and persistence switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default)]
    pub startup: StartupMode,
    #[serde(default)]
    pub config: ConfigMode,
    /// Auto-start even if the entry point failed.
    #[serde(default)]
    pub start_with_error: bool,
    /// Verbose logging for local runs.
    #[serde(default)]
    pub testing: bool,
    /// Force `testing` off when running inside Kubernetes.
    #[serde(default = "default_true")]
    pub deploy_safely: bool,
}

/// Run loop settings. Durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Queue identifier to run. Empty strings count as unset.
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default = "default_true")]
    pub single_run: bool,
    #[serde(default = "default_sleep_min")]
    pub sleep_min: f64,
    #[serde(default = "default_sleep_max")]
    pub sleep_max: f64,
    #[serde(default = "default_true")]
    pub exit_on_finish: bool,
    #[serde(default = "default_exit_delay")]
    pub exit_delay: f64,
}

/// A queue the default worker knows how to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDef {
    /// Program followed by its arguments, executed once per tick.
    pub command: Vec<String>,
    /// Passive queues are listed in the snapshot but not offered in the menu.
    #[serde(default)]
    pub passive: bool,
}

fn default_true() -> bool {
    true
}

fn default_sleep_min() -> f64 {
    3.0
}

fn default_sleep_max() -> f64 {
    5.0
}

fn default_exit_delay() -> f64 {
    3.0
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            startup: StartupMode::default(),
            config: ConfigMode::default(),
            start_with_error: false,
            testing: false,
            deploy_safely: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            queue: None,
            single_run: true,
            sleep_min: default_sleep_min(),
            sleep_max: default_sleep_max(),
            exit_on_finish: true,
            exit_delay: default_exit_delay(),
        }
    }
}

impl Settings {
    /// The configured queue identifier, ignoring blank values.
    pub fn queue(&self) -> Option<&str> {
        self.run
            .queue
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn set_queue(&mut self, queue: impl Into<String>) {
        self.run.queue = Some(queue.into());
    }
}
