//! In-process record store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{OwnerId, PetRecord};

/// A [`RecordStore`] backed by a `BTreeMap`.
///
/// Can be flipped read-only, after which every write fails with
/// [`StoreError::ReadOnly`] and leaves the map untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<OwnerId, PetRecord>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle read-only mode.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&self) -> StoreResult<Vec<(OwnerId, PetRecord)>> {
        Ok(self
            .records
            .read()
            .iter()
            .map(|(owner, record)| (owner.clone(), record.clone()))
            .collect())
    }

    fn load(&self, owner: &OwnerId) -> StoreResult<Option<PetRecord>> {
        Ok(self.records.read().get(owner).cloned())
    }

    fn save(&self, owner: &OwnerId, record: &PetRecord) -> StoreResult<()> {
        self.check_writable()?;
        self.records.write().insert(owner.clone(), record.clone());
        Ok(())
    }

    fn save_all(&self, records: &[(OwnerId, PetRecord)]) -> StoreResult<()> {
        self.check_writable()?;
        let mut map = self.records.write();
        for (owner, record) in records {
            map.insert(owner.clone(), record.clone());
        }
        Ok(())
    }

    fn delete(&self, owner: &OwnerId) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.records.write().remove(owner).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use chrono::Utc;

    #[test]
    fn crud() {
        let store = MemoryStore::new();
        let owner = OwnerId::from("1");
        let pet = PetRecord::new(Species::Car, Utc::now());

        assert!(store.load(&owner).expect("load").is_none());
        store.save(&owner, &pet).expect("save");
        assert_eq!(store.load(&owner).expect("load"), Some(pet));
        assert_eq!(store.len(), 1);
        assert!(store.delete(&owner).expect("delete"));
        assert!(!store.delete(&owner).expect("delete again"));
        assert!(store.is_empty());
    }

    #[test]
    fn read_only_rejects_writes() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let owner = OwnerId::from("1");
        let pet = PetRecord::new(Species::Car, Utc::now());

        assert!(matches!(store.save(&owner, &pet), Err(StoreError::ReadOnly)));
        assert!(matches!(
            store.save_all(&[(owner.clone(), pet)]),
            Err(StoreError::ReadOnly)
        ));
        assert!(store.is_empty());
    }
}
