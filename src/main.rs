use anyhow::{Context, Result};
use clap::Parser;

use lanekeeper::cli::{self, Cli};
use lanekeeper::config::Settings;
use lanekeeper::lifecycle::run_process;

fn main() -> Result<()> {
    let args = Cli::parse();
    let config_path = args.config_path();
    let snapshot_path = Settings::snapshot_path(&config_path);

    let settings = Settings::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let mut controller = cli::build_controller(settings, &config_path)?;
    controller.initialize();
    controller.stop_signal().register_sigterm();

    let result = run_process(&mut controller, |controller| {
        cli::dispatch(args.command, &snapshot_path, controller)
    });

    if result.is_ok() {
        if let Some(delay) = controller.exit_after() {
            tracing::info!(delay_secs = delay.as_secs_f64(), "Exiting after run");
            std::thread::sleep(delay);
            std::process::exit(0);
        }
    }
    result
}
