use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_FILTER_ENV: &str = "LANEKEEPER_LOG";
/// Environment variable holding a log file path prefix.
pub const LOG_FILE_ENV: &str = "LANEKEEPER_LOG_FILE";

/// Initialize tracing.
///
/// The filter comes from `LANEKEEPER_LOG`, falling back to `debug` when
/// `testing` is set and `info` otherwise. Logs go to stderr unless
/// `LANEKEEPER_LOG_FILE` names a file prefix; the file is then created as
/// `{path}.{timestamp}.{pid}` so the queue menu's screen stays clean.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(testing: bool) -> bool {
    let default_level = if testing { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(log_path) = std::env::var(LOG_FILE_ENV).ok().filter(|p| !p.is_empty()) {
        let pid = std::process::id();
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let unique_path = format!("{}.{}.{}", log_path, timestamp, pid);

        match std::fs::File::create(&unique_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true);

                return tracing_subscriber::registry()
                    .with(filter)
                    .with(file_layer)
                    .try_init()
                    .is_ok();
            }
            Err(_) => eprintln!("Warning: Failed to create log file: {}", unique_path),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .try_init()
        .is_ok()
}
