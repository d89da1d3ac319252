//! [`PetpalRuntime`] builds the pet service from config and owns the
//! background decay task.

use std::sync::Arc;

use petpal_core::clock::{Clock, SystemClock};
use petpal_core::error::Result;
use petpal_core::scheduler::{DecayScheduler, SchedulerStats};
use petpal_core::store::{self, RecordStore};
use petpal_core::{PetService, PetpalConfig};
use tracing::{info, warn};

use crate::decay_task::{self, DecayTaskHandle};

/// A configured pet service plus its decay task.
pub struct PetpalRuntime {
    config: PetpalConfig,
    service: Arc<PetService>,
    clock: Arc<dyn Clock>,
    decay: Option<DecayTaskHandle>,
}

impl std::fmt::Debug for PetpalRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetpalRuntime")
            .field("config", &self.config)
            .field("decay", &self.decay)
            .finish_non_exhaustive()
    }
}

impl PetpalRuntime {
    /// Open the configured store and build the service on the system clock.
    ///
    /// # Errors
    ///
    /// Invalid config, or the store could not be opened.
    pub fn from_config(config: PetpalConfig) -> Result<Self> {
        config.validate()?;
        let store = store::open_store(&config.persistence)?;
        info!(
            backend = %config.persistence.backend,
            path = %config.persistence.path.display(),
            "Pet store opened"
        );
        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    /// Build around an existing store and clock.
    #[must_use]
    pub fn with_store(
        config: PetpalConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let service = PetService::new(store)
            .with_clock(Arc::clone(&clock))
            .with_gameplay(config.gameplay.clone());
        Self {
            config,
            service: Arc::new(service),
            clock,
            decay: None,
        }
    }

    /// The pet service, for the chat layer to call.
    #[must_use]
    pub fn service(&self) -> &Arc<PetService> {
        &self.service
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &PetpalConfig {
        &self.config
    }

    /// Whether the decay task is running.
    #[must_use]
    pub fn is_decaying(&self) -> bool {
        self.decay.is_some()
    }

    /// Decay counters, if the task is running.
    #[must_use]
    pub fn decay_stats(&self) -> Option<SchedulerStats> {
        self.decay.as_ref().map(DecayTaskHandle::stats)
    }

    /// Start the decay task, unless `[decay] enabled = false` or it is
    /// already running. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PetpalError::Config`](petpal_core::PetpalError::Config) for an
    /// unusable interval.
    pub fn start(&mut self) -> Result<()> {
        if !self.config.decay.enabled {
            info!("Decay disabled by config");
            return Ok(());
        }
        if self.decay.is_some() {
            return Ok(());
        }
        let scheduler = Arc::new(DecayScheduler::new(self.config.decay.interval())?);
        self.decay = Some(decay_task::spawn(
            Arc::clone(&self.service),
            scheduler,
            Arc::clone(&self.clock),
        ));
        Ok(())
    }

    /// Stop the decay task, waiting for an in-flight tick, then back up the
    /// store.
    pub async fn shutdown(mut self) -> Option<SchedulerStats> {
        let stats = match self.decay.take() {
            Some(handle) => Some(handle.shutdown().await),
            None => None,
        };

        let service = Arc::clone(&self.service);
        match tokio::task::spawn_blocking(move || service.snapshot()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Shutdown backup failed"),
            Err(e) => warn!(error = %e, "Shutdown backup task did not complete"),
        }

        info!("PetPal runtime stopped");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use chrono::Utc;
    use petpal_core::store::MemoryStore;
    use petpal_core::{Action, OwnerId};
    use std::time::Duration;

    fn memory_config() -> PetpalConfig {
        let mut config = PetpalConfig::default();
        config.persistence.backend = "memory".to_string();
        config
    }

    #[test]
    fn builds_from_memory_config() {
        let runtime = PetpalRuntime::from_config(memory_config()).expect("runtime");
        assert!(!runtime.is_decaying());
        assert_eq!(
            runtime.service().gameplay().max_name_len,
            runtime.config().gameplay.max_name_len
        );
        let owner = OwnerId::from("1");
        runtime.service().adopt(&owner).expect("adopt");
        runtime.service().apply_action(&owner, Action::Play).expect("play");
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = memory_config();
        config.decay.interval_seconds = 0;
        assert!(PetpalRuntime::from_config(config).is_err());
    }

    #[test]
    fn opens_sqlite_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = PetpalConfig::default();
        config.persistence.path = dir.path().join("pets.db");
        let runtime = PetpalRuntime::from_config(config).expect("runtime");
        runtime.service().adopt(&OwnerId::from("1")).expect("adopt");
        assert!(dir.path().join("pets.db").exists());
    }

    #[tokio::test]
    async fn shutdown_backs_up_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = PetpalConfig::default();
        config.decay.enabled = false;
        config.persistence.path = dir.path().join("pets.db");
        let runtime = PetpalRuntime::from_config(config).expect("runtime");
        runtime.service().adopt(&OwnerId::from("1")).expect("adopt");

        runtime.shutdown().await;
        assert!(dir.path().join("pets.db.bak.1").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_decay_starts_nothing() {
        let mut config = memory_config();
        config.decay.enabled = false;
        let mut runtime = PetpalRuntime::from_config(config).expect("runtime");
        runtime.start().expect("start");
        assert!(!runtime.is_decaying());
        assert_eq!(runtime.shutdown().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn decays_until_shutdown() {
        let mut config = memory_config();
        config.decay.interval_seconds = 600;
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(TokioClock::anchored_at(Utc::now()));
        let mut runtime = PetpalRuntime::with_store(config, store, clock);
        let owner = OwnerId::from("2");
        runtime.service().adopt(&owner).expect("adopt");

        runtime.start().expect("start");
        runtime.start().expect("second start is a no-op");
        assert!(runtime.is_decaying());

        // Ticks at 0, 10, 20, 30 minutes.
        tokio::time::sleep(Duration::from_secs(30 * 60 + 5)).await;
        let service = Arc::clone(runtime.service());
        let stats = runtime.shutdown().await.expect("stats");
        assert_eq!(stats.ticks_run, 4);
        let pet = service.record(&owner).expect("load").expect("pet");
        assert_eq!(pet.hunger, 70);
    }
}
