//! Record storage.
//!
//! The core never touches disk or network itself; everything goes through a
//! [`RecordStore`]. Three backends ship with the crate:
//!
//! - [`MemoryStore`] — in-process map, for tests and ephemeral bots.
//! - [`JsonFileStore`] — one JSON object keyed by owner id, rewritten atomically.
//! - [`SqliteStore`] — one row per owner, WAL mode, checksums, backups.

pub mod json;
pub mod memory;
pub mod sqlite;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::config::PersistenceConfig;
use crate::error::{PetpalError, Result, StoreResult};
use crate::types::{OwnerId, PetRecord};

/// Keyed storage for pet records.
///
/// Implementations do their own retrying, if any; errors are surfaced to the
/// caller as-is.
pub trait RecordStore: Send + Sync {
    /// Every stored record, in no particular order.
    ///
    /// # Errors
    /// Backend failure.
    fn load_all(&self) -> StoreResult<Vec<(OwnerId, PetRecord)>>;

    /// The record for `owner`, if any.
    ///
    /// # Errors
    /// Backend failure.
    fn load(&self, owner: &OwnerId) -> StoreResult<Option<PetRecord>>;

    /// Insert or replace the record for `owner`.
    ///
    /// # Errors
    /// Backend failure.
    fn save(&self, owner: &OwnerId, record: &PetRecord) -> StoreResult<()>;

    /// Insert or replace many records at once. Either all are written or none.
    ///
    /// # Errors
    /// Backend failure; nothing was written.
    fn save_all(&self, records: &[(OwnerId, PetRecord)]) -> StoreResult<()>;

    /// Remove the record for `owner`. Returns `true` if one existed.
    ///
    /// # Errors
    /// Backend failure.
    fn delete(&self, owner: &OwnerId) -> StoreResult<bool>;

    /// Take a point-in-time copy of the store, if the backend keeps backups.
    ///
    /// # Errors
    /// Backend failure.
    fn snapshot(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn load_all(&self) -> StoreResult<Vec<(OwnerId, PetRecord)>> {
        (**self).load_all()
    }

    fn load(&self, owner: &OwnerId) -> StoreResult<Option<PetRecord>> {
        (**self).load(owner)
    }

    fn save(&self, owner: &OwnerId, record: &PetRecord) -> StoreResult<()> {
        (**self).save(owner, record)
    }

    fn save_all(&self, records: &[(OwnerId, PetRecord)]) -> StoreResult<()> {
        (**self).save_all(records)
    }

    fn delete(&self, owner: &OwnerId) -> StoreResult<bool> {
        (**self).delete(owner)
    }

    fn snapshot(&self) -> StoreResult<()> {
        (**self).snapshot()
    }
}

/// Open the backend selected by `config.backend`.
///
/// # Errors
///
/// Returns [`PetpalError::Config`] for an unknown backend name, or the
/// backend's own error if it fails to open.
pub fn open_store(config: &PersistenceConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend.as_str() {
        "sqlite" => Arc::new(SqliteStore::open(&config.path, config)?),
        "json" => Arc::new(JsonFileStore::open(&config.path)?),
        "memory" => Arc::new(MemoryStore::new()),
        other => {
            return Err(PetpalError::Config(format!(
                "unknown persistence backend: {other}"
            )));
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_is_a_config_error() {
        let config = PersistenceConfig {
            backend: "redis".to_string(),
            ..PersistenceConfig::default()
        };
        assert!(matches!(open_store(&config), Err(PetpalError::Config(_))));
    }

    #[test]
    fn memory_backend_opens() {
        let config = PersistenceConfig {
            backend: "memory".to_string(),
            ..PersistenceConfig::default()
        };
        let store = open_store(&config).expect("open");
        assert!(store.load_all().expect("load").is_empty());
    }
}
