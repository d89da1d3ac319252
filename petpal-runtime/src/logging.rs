//! Tracing subscriber setup.
//!
//! The level comes from `[general] log_level`; `RUST_LOG`, when set, wins.

use petpal_core::config::GeneralConfig;
use petpal_core::PetpalError;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if present, else the configured level.
///
/// # Errors
///
/// [`PetpalError::Config`] if the configured level is not a valid directive.
pub fn env_filter(general: &GeneralConfig) -> Result<EnvFilter, PetpalError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&general.log_level).map_err(|e| {
            PetpalError::Config(format!("invalid log_level {:?}: {e}", general.log_level))
        }),
    }
}

/// Install the global subscriber. Plain text to stderr, or JSON lines when
/// `json_logs` is set.
///
/// # Errors
///
/// [`PetpalError::Config`] for a bad level or if a subscriber is already set.
pub fn init(general: &GeneralConfig) -> Result<(), PetpalError> {
    let filter = env_filter(general)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if general.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| PetpalError::Config(format!("logging already initialised: {e}")))?;

    tracing::debug!(level = %general.log_level, json = general.json_logs, "Logging initialised");
    Ok(())
}
