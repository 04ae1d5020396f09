//! RenalSight: kidney-failure risk for children with CAKUT
//!
//! Main entry point for the terminal application.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use renalsight::adapters::ModelStore;
use renalsight::application::PredictionService;
use renalsight::tui::App;
use renalsight::AppConfig;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Writing logs to the terminal corrupts the TUI (alternate screen):
    // interactive sessions log to a file, everything else to stdout.
    let use_file = config.log_mode.use_file(std::io::stdout().is_terminal());

    let (writer, _guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: a missing directory surfaces on open below.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("opening log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    tracing::info!("Starting RenalSight...");

    // Model-load failure is fatal: there is no fallback model.
    let store = ModelStore::new(&config.model_dir, config.require_manifest);
    let models = store
        .load_all()
        .with_context(|| format!("loading models from {:?}", store.dir()))?;
    let service = PredictionService::new(models, config.failure_policy);

    let mut app = App::new(service);
    app.run()?;

    tracing::info!("RenalSight shutdown complete.");
    Ok(())
}
