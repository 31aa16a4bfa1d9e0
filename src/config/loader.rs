use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::types::{ConfigMode, Settings, StartupMode};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "LANEKEEPER_";

const CONFIG_FILE_NAME: &str = "lanekeeper.toml";
const SNAPSHOT_FILE_NAME: &str = ".lanekeeper.state.toml";

/// Errors that can occur when loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config file '{path}': {source}")]
    SerializeError {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Invalid value '{value}' for environment variable {key}")]
    InvalidEnv { key: String, value: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Settings {
    /// Returns the project-local configuration path, `./lanekeeper.toml`.
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Returns the snapshot path that sits next to `config_path`.
    pub fn snapshot_path(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .map(|dir| dir.join(SNAPSHOT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(SNAPSHOT_FILE_NAME))
    }

    /// Loads settings from `path`, applies environment overrides and validates.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::load_from(path)?;
        settings.apply_env(std::env::vars())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses `path` as TOML without environment overrides or validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Applies `LANEKEEPER_*` overrides from `vars`.
    ///
    /// Unknown keys under the prefix are ignored. When `deploy_safely` is on
    /// and any variable name mentions Kubernetes, `testing` is forced off.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |name: &'static str| {
            vars.get(&format!("{ENV_PREFIX}{name}"))
                .map(|value| (name, value.as_str()))
        };

        if let Some((_, value)) = get("QUEUE") {
            self.run.queue = Some(value.to_string());
        }
        if let Some((name, value)) = get("SINGLE_RUN") {
            self.run.single_run = parse_bool(name, value)?;
        }
        if let Some((name, value)) = get("SLEEP_MIN") {
            self.run.sleep_min = parse_secs(name, value)?;
        }
        if let Some((name, value)) = get("SLEEP_MAX") {
            self.run.sleep_max = parse_secs(name, value)?;
        }
        if let Some((name, value)) = get("EXIT_ON_FINISH") {
            self.run.exit_on_finish = parse_bool(name, value)?;
        }
        if let Some((name, value)) = get("EXIT_DELAY") {
            self.run.exit_delay = parse_secs(name, value)?;
        }
        if let Some((name, value)) = get("STARTUP") {
            self.framework.startup =
                StartupMode::parse(value).ok_or_else(|| invalid(name, value))?;
        }
        if let Some((name, value)) = get("CONFIG") {
            self.framework.config = ConfigMode::parse(value).ok_or_else(|| invalid(name, value))?;
        }
        if let Some((name, value)) = get("START_WITH_ERROR") {
            self.framework.start_with_error = parse_bool(name, value)?;
        }
        if let Some((name, value)) = get("DEPLOY_SAFELY") {
            self.framework.deploy_safely = parse_bool(name, value)?;
        }
        if let Some((name, value)) = get("TESTING") {
            self.framework.testing = parse_bool(name, value)?;
        }

        let in_kubernetes = vars
            .keys()
            .any(|key| key.to_ascii_lowercase().contains("kubernetes"));
        if self.framework.deploy_safely && in_kubernetes {
            self.framework.testing = false;
        }

        Ok(())
    }

    /// Validates the run loop bounds.
    ///
    /// Checks:
    /// - every duration is a non-negative number of seconds that fits a `Duration`
    /// - `sleep_max` is not below `sleep_min`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;
        for (name, value) in [
            ("sleep_min", run.sleep_min),
            ("sleep_max", run.sleep_max),
            ("exit_delay", run.exit_delay),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::ValidationError {
                    message: format!("{name} must be a non-negative number of seconds, got {value}"),
                });
            }
        }

        if run.sleep_max < run.sleep_min {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "sleep_max ({}) must not be lower than sleep_min ({})",
                    run.sleep_max, run.sleep_min
                ),
            });
        }

        for (name, queue) in &self.queues {
            if queue.command.is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("Queue '{name}' has an empty command"),
                });
            }
        }

        Ok(())
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_secs(name: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}
