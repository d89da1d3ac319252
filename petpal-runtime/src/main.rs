//! `petpal` daemon: loads config, opens the pet store and runs passive
//! decay until interrupted.
//!
//! Usage: `petpal [CONFIG.toml]`, or set `PETPAL_CONFIG`. With neither,
//! built-in defaults are used.

use std::path::PathBuf;

use anyhow::{Context, Result};
use petpal_core::PetpalConfig;
use petpal_runtime::{logging, PetpalRuntime};

/// Config path from the first argument, else `PETPAL_CONFIG`.
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("PETPAL_CONFIG"))
        .map(PathBuf::from)
}

fn load_config() -> Result<PetpalConfig> {
    match config_path() {
        Some(path) => PetpalConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(PetpalConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    logging::init(&config.general).context("initialising logging")?;

    let mut runtime = PetpalRuntime::from_config(config).context("starting runtime")?;
    runtime.start().context("starting decay task")?;
    tracing::info!(
        pets = runtime.service().pet_count()?,
        "PetPal running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    if let Some(stats) = runtime.shutdown().await {
        tracing::info!(
            ticks_run = stats.ticks_run,
            ticks_failed = stats.ticks_failed,
            ticks_skipped = stats.ticks_skipped,
            "Shutdown complete"
        );
    }
    Ok(())
}
