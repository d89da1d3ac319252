//! `PetService` — the entry point for the chat layer.
//!
//! Every mutating call runs load → modify → save while holding the owner's
//! lock, so two concurrent commands for the same pet can't lose an update.
//! The decay sweep takes the sweep gate exclusively; commands take it
//! shared. A sweep therefore never interleaves with an in-flight command,
//! while commands for different owners still run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::actions::{self, Action, ActionOutcome, ActionResult};
use crate::card::PetCard;
use crate::clock::{Clock, SystemClock};
use crate::config::GameplayConfig;
use crate::decay;
use crate::error::{PetpalError, Result};
use crate::leaderboard;
use crate::species::Species;
use crate::store::RecordStore;
use crate::types::{OwnerId, PetRecord};

/// Prune idle owner locks once the table grows past this many entries.
const OWNER_LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Returned by [`PetService::adopt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdoptionSummary {
    /// The new owner.
    pub owner: OwnerId,
    /// Species rolled at adoption.
    pub species: Species,
    /// Emoji of the starting form.
    pub emoji: &'static str,
    /// The new record.
    pub record: PetRecord,
}

/// Returned by [`PetService::rename`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    /// Name before the rename.
    pub old_name: String,
    /// Name after the rename.
    pub new_name: String,
    /// The updated record.
    pub record: PetRecord,
}

/// Returned by [`PetService::abandon`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedSummary {
    /// Former owner.
    pub owner: OwnerId,
    /// The record as it was when deleted.
    pub record: PetRecord,
}

/// The pet core, wired to its collaborators.
pub struct PetService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    gameplay: GameplayConfig,
    owner_locks: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
    sweep_gate: RwLock<()>,
}

impl std::fmt::Debug for PetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetService")
            .field("gameplay", &self.gameplay)
            .field("owner_locks", &self.owner_locks.lock().len())
            .finish_non_exhaustive()
    }
}

impl PetService {
    /// A service over `store` using the system clock and an entropy-seeded RNG.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            gameplay: GameplayConfig::default(),
            owner_locks: Mutex::new(HashMap::new()),
            sweep_gate: RwLock::new(()),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the random source.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    /// Replace the gameplay limits.
    #[must_use]
    pub fn with_gameplay(mut self, gameplay: GameplayConfig) -> Self {
        self.gameplay = gameplay;
        self
    }

    /// The clock this service stamps records with.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Gameplay limits in effect.
    #[must_use]
    pub fn gameplay(&self) -> &GameplayConfig {
        &self.gameplay
    }

    fn owner_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock();
        if locks.len() >= OWNER_LOCK_PRUNE_THRESHOLD {
            // Only the table holds these; nobody can be waiting on them.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(owner.clone()).or_default())
    }

    /// Run `f` with exclusive access to `owner`'s record.
    fn with_owner<T>(&self, owner: &OwnerId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _gate = self.sweep_gate.read();
        let lock = self.owner_lock(owner);
        let _guard = lock.lock();
        f()
    }

    fn load_existing(&self, owner: &OwnerId) -> Result<PetRecord> {
        self.store
            .load(owner)?
            .ok_or_else(|| PetpalError::NoRecord(owner.clone()))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Adopt a pet of a random species.
    ///
    /// # Errors
    ///
    /// [`PetpalError::AlreadyExists`] if the owner has a pet, or a
    /// persistence failure.
    pub fn adopt(&self, owner: &OwnerId) -> Result<AdoptionSummary> {
        let species = *Species::ALL
            .choose(&mut **self.rng.lock())
            .unwrap_or(&Species::Car);
        self.adopt_species(owner, species)
    }

    /// Adopt a pet of a given species.
    ///
    /// # Errors
    ///
    /// [`PetpalError::AlreadyExists`] if the owner has a pet, or a
    /// persistence failure.
    pub fn adopt_species(&self, owner: &OwnerId, species: Species) -> Result<AdoptionSummary> {
        self.with_owner(owner, || {
            if self.store.load(owner)?.is_some() {
                return Err(PetpalError::AlreadyExists(owner.clone()));
            }

            let record = PetRecord::new(species, self.clock.now());
            self.store.save(owner, &record)?;
            info!(owner = %owner, %species, "Pet adopted");

            Ok(AdoptionSummary {
                owner: owner.clone(),
                species,
                emoji: record.emoji(),
                record,
            })
        })
    }

    /// Delete the owner's pet.
    ///
    /// # Errors
    ///
    /// [`PetpalError::NoRecord`] if the owner has no pet, or a persistence
    /// failure.
    pub fn abandon(&self, owner: &OwnerId) -> Result<AbandonedSummary> {
        self.with_owner(owner, || {
            let record = self.load_existing(owner)?;
            self.store.delete(owner)?;
            info!(owner = %owner, name = %record.name, level = record.level, "Pet abandoned");
            Ok(AbandonedSummary {
                owner: owner.clone(),
                record,
            })
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The owner's pet, if any.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn record(&self, owner: &OwnerId) -> Result<Option<PetRecord>> {
        Ok(self.store.load(owner)?)
    }

    /// Display data for the owner's pet, if any.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn card(&self, owner: &OwnerId) -> Result<Option<PetCard>> {
        Ok(self.record(owner)?.as_ref().map(PetCard::from))
    }

    /// The best `limit` pets by `(level, xp)`.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<(OwnerId, PetRecord)>> {
        Ok(leaderboard::top(self.store.load_all()?, limit))
    }

    /// The leaderboard at the configured size.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn default_leaderboard(&self) -> Result<Vec<(OwnerId, PetRecord)>> {
        self.leaderboard(self.gameplay.leaderboard_limit)
    }

    /// How many pets exist.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn pet_count(&self) -> Result<usize> {
        Ok(self.store.load_all()?.len())
    }

    /// The owner's 1-based leaderboard position.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn rank(&self, owner: &OwnerId) -> Result<Option<usize>> {
        Ok(leaderboard::rank_of(&self.store.load_all()?, owner))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Feed, play with or put the owner's pet to sleep.
    ///
    /// # Errors
    ///
    /// [`PetpalError::NoRecord`], [`PetpalError::PreconditionFailed`], or a
    /// persistence failure. Nothing is saved unless the action succeeds.
    pub fn apply_action(&self, owner: &OwnerId, action: Action) -> Result<ActionOutcome> {
        self.with_owner(owner, || {
            let mut record = self.load_existing(owner)?;
            let result = {
                let mut rng = self.rng.lock();
                actions::apply(&mut record, action, &mut **rng)?
            };

            match result {
                ActionResult::Applied(outcome) => {
                    self.store.save(owner, &record)?;
                    if outcome.progress.leveled_up() {
                        info!(owner = %owner, level = record.level, "Pet leveled up");
                    }
                    Ok(*outcome)
                }
                ActionResult::Rejected(rejection) => {
                    debug!(owner = %owner, %action, %rejection, "Action refused");
                    Err(PetpalError::PreconditionFailed(rejection))
                }
            }
        })
    }

    /// [`apply_action`](Self::apply_action) by command name.
    ///
    /// # Errors
    ///
    /// [`PetpalError::UnknownAction`] for an unrecognised name, otherwise as
    /// [`apply_action`](Self::apply_action).
    pub fn apply_named_action(&self, owner: &OwnerId, action: &str) -> Result<ActionOutcome> {
        self.apply_action(owner, action.parse()?)
    }

    /// Rename the owner's pet.
    ///
    /// The name is trimmed; its length is counted in characters.
    ///
    /// # Errors
    ///
    /// [`PetpalError::NoRecord`], [`PetpalError::EmptyName`],
    /// [`PetpalError::NameTooLong`], or a persistence failure.
    pub fn rename(&self, owner: &OwnerId, new_name: &str) -> Result<RenameOutcome> {
        self.with_owner(owner, || {
            let mut record = self.load_existing(owner)?;

            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(PetpalError::EmptyName);
            }
            let len = new_name.chars().count();
            let max = self.gameplay.max_name_len;
            if len > max {
                return Err(PetpalError::NameTooLong { len, max });
            }

            let old_name = std::mem::replace(&mut record.name, new_name.to_string());
            self.store.save(owner, &record)?;
            info!(owner = %owner, old = %old_name, new = %new_name, "Pet renamed");

            Ok(RenameOutcome {
                old_name,
                new_name: new_name.to_string(),
                record,
            })
        })
    }

    // ------------------------------------------------------------------
    // Decay
    // ------------------------------------------------------------------

    /// Apply one decay tick to every pet and save them in one batch.
    ///
    /// Returns how many pets were updated. If the save fails, nothing is
    /// written and the error is returned.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn run_decay_tick(&self, now: DateTime<Utc>) -> Result<usize> {
        let _gate = self.sweep_gate.write();
        let mut records = self.store.load_all()?;
        if records.is_empty() {
            debug!("Decay tick: no pets");
            return Ok(0);
        }

        let updated = decay::decay_all(&mut records, now);
        self.store.save_all(&records)?;
        info!(pets = updated, tick = %now, "Decay tick applied");
        Ok(updated)
    }

    /// Ask the store for a backup while no command or sweep is writing.
    ///
    /// # Errors
    ///
    /// Persistence failure.
    pub fn snapshot(&self) -> Result<()> {
        let _gate = self.sweep_gate.write();
        self.store.snapshot()?;
        Ok(())
    }
}
