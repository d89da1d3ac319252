//! Configuration for PetPal.
//!
//! Maps directly to `petpal.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a working setup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest accepted decay interval: one year.
pub const MAX_DECAY_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level PetPal configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetpalConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Gameplay limits.
    #[serde(default)]
    pub gameplay: GameplayConfig,
    /// Decay scheduling.
    #[serde(default)]
    pub decay: DecayConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PetpalConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `PetpalError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::PetpalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values that parse but make no sense.
    ///
    /// # Errors
    /// Returns `PetpalError::Config` naming the offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.gameplay.max_name_len == 0 {
            return Err(crate::PetpalError::Config(
                "gameplay.max_name_len must be at least 1".to_string(),
            ));
        }
        if self.decay.interval_seconds == 0 {
            return Err(crate::PetpalError::Config(
                "decay.interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.decay.interval_seconds > MAX_DECAY_INTERVAL_SECS {
            return Err(crate::PetpalError::Config(format!(
                "decay.interval_seconds must be at most {MAX_DECAY_INTERVAL_SECS}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Gameplay limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameplayConfig {
    /// Maximum pet name length, in characters.
    #[serde(default = "default_20")]
    pub max_name_len: usize,
    /// Entries shown on the leaderboard.
    #[serde(default = "default_10")]
    pub leaderboard_limit: usize,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            max_name_len: 20,
            leaderboard_limit: 10,
        }
    }
}

/// Passive decay scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Whether the decay task runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between decay ticks.
    #[serde(default = "default_3600")]
    pub interval_seconds: u64,
}

impl DecayConfig {
    /// The tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 3600,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite", "json" or "memory".
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Database or JSON file path.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Number of save backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: default_path(),
            wal_mode: true,
            checksum_enabled: true,
            backup_count: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_path() -> PathBuf { PathBuf::from("petpal.db") }
fn default_3() -> u32 { 3 }
fn default_10() -> usize { 10 }
fn default_20() -> usize { 20 }
fn default_3600() -> u64 { 3600 }
