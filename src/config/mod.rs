mod loader;
mod snapshot;
mod types;

pub use loader::{ConfigError, ENV_PREFIX};
pub use snapshot::{ConfigSnapshot, DiscoveredSection, LastRun, SnapshotFile, SnapshotStore};
pub use types::{ConfigMode, FrameworkConfig, QueueDef, RunConfig, Settings, StartupMode};
