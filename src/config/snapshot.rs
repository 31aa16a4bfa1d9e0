//! Run snapshot persisted when the process exits.
//!
//! The snapshot remembers the last queue that ran and the queues the worker
//! discovered, so the queue menu can preselect and list them next time.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

/// Collaborator that records what a run did.
pub trait ConfigSnapshot {
    fn write_last_run(&mut self, queue: &str);
    fn write_discovered_queues(&mut self, active: &[String], passive: &[String]);
    fn save(&mut self) -> Result<(), ConfigError>;
}

/// On-disk shape of the snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<LastRun>,
    #[serde(default)]
    pub queues: DiscoveredSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastRun {
    pub queue: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredSection {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub passive: Vec<String>,
}

/// TOML-backed [`ConfigSnapshot`].
///
/// Existing content is loaded on open so a `discrete` run keeps the previous
/// last-run entry.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    file: SnapshotFile,
}

impl SnapshotStore {
    /// Opens the snapshot at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let file = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
                path: path.clone(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?
        } else {
            SnapshotFile::default()
        };

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_run_queue(&self) -> Option<&str> {
        self.file.last_run.as_ref().map(|run| run.queue.as_str())
    }

    pub fn file(&self) -> &SnapshotFile {
        &self.file
    }
}

impl ConfigSnapshot for SnapshotStore {
    fn write_last_run(&mut self, queue: &str) {
        self.file.last_run = Some(LastRun {
            queue: queue.to_string(),
        });
    }

    fn write_discovered_queues(&mut self, active: &[String], passive: &[String]) {
        self.file.queues = DiscoveredSection {
            active: active.to_vec(),
            passive: passive.to_vec(),
        };
    }

    fn save(&mut self) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(&self.file).map_err(|e| ConfigError::SerializeError {
                path: self.path.clone(),
                source: e,
            })?;

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| ConfigError::WriteError {
                path: self.path.clone(),
                source: e,
            })?;
        }

        fs::write(&self.path, content).map_err(|e| ConfigError::WriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}
