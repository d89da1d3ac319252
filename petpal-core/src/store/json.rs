//! Flat-file JSON store.
//!
//! The whole world is one JSON object mapping owner id to record:
//!
//! ```json
//! { "1234": { "name": "chick", "species": "bird", "level": 1, ... } }
//! ```
//!
//! Every write rewrites the file through a sibling temp file and a rename, so
//! a crash mid-write leaves the previous version intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::RecordStore;
use crate::error::StoreResult;
use crate::types::{OwnerId, PetRecord};

type RecordMap = BTreeMap<OwnerId, PetRecord>;

/// A [`RecordStore`] persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use the file at `path`, creating it lazily on first write.
    ///
    /// An existing file is parsed once up front so corruption surfaces at
    /// startup rather than on the first command.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`](crate::error::StoreError::Io) or
    /// [`StoreError::Serialization`](crate::error::StoreError::Serialization)
    /// if an existing file can't be read.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        };
        let existing = store.read_map()?;
        info!(
            path = %store.path.display(),
            pets = existing.len(),
            "JSON pet store opened"
        );
        Ok(store)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StoreResult<RecordMap> {
        if !self.path.exists() {
            return Ok(RecordMap::new());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecordMap::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_map(&self, map: &RecordMap) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(map)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(pets = map.len(), bytes = json.len(), "Wrote pet file");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn modify<T>(&self, f: impl FnOnce(&mut RecordMap) -> T) -> StoreResult<T> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        let out = f(&mut map);
        self.write_map(&map)?;
        Ok(out)
    }
}

impl RecordStore for JsonFileStore {
    fn load_all(&self) -> StoreResult<Vec<(OwnerId, PetRecord)>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.into_iter().collect())
    }

    fn load(&self, owner: &OwnerId) -> StoreResult<Option<PetRecord>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.remove(owner))
    }

    fn save(&self, owner: &OwnerId, record: &PetRecord) -> StoreResult<()> {
        self.modify(|map| {
            map.insert(owner.clone(), record.clone());
        })
    }

    fn save_all(&self, records: &[(OwnerId, PetRecord)]) -> StoreResult<()> {
        self.modify(|map| {
            for (owner, record) in records {
                map.insert(owner.clone(), record.clone());
            }
        })
    }

    fn delete(&self, owner: &OwnerId) -> StoreResult<bool> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(owner).is_none() {
            return Ok(false);
        }
        self.write_map(&map)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::species::Species;
    use chrono::Utc;

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("petpal_data.json");
        let owner = OwnerId::from("99");
        let pet = PetRecord::new(Species::Dragon, Utc::now());

        let store = JsonFileStore::open(&path).expect("open");
        store.save(&owner, &pet).expect("save");
        assert!(!store.tmp_path().exists(), "temp file should be renamed away");

        let reopened = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(reopened.load(&owner).expect("load"), Some(pet));
    }

    #[test]
    fn save_all_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("pets.json")).expect("open");
        let records: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|id| (OwnerId::from(*id), PetRecord::new(Species::Bird, Utc::now())))
            .collect();

        store.save_all(&records).expect("save_all");
        assert_eq!(store.load_all().expect("load_all").len(), 3);
        assert!(store.delete(&OwnerId::from("b")).expect("delete"));
        assert!(!store.delete(&OwnerId::from("b")).expect("delete again"));
        assert_eq!(store.load_all().expect("load_all").len(), 2);
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pets.json");
        fs::write(&path, b"{ not json").expect("write");
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("absent.json")).expect("open");
        assert!(store.load_all().expect("load_all").is_empty());
    }
}
