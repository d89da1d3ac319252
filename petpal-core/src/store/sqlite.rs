//! SQLite record store.
//!
//! Each owner's [`PetRecord`] is serialised to JSON and stored in one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS pets (
//!     owner_id   TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - WAL mode so leaderboard reads don't block command writes.
//! - JSON inside a BLOB keeps the schema stable when the record grows fields.
//! - Optional CRC-32 checksum detects save corruption.
//! - `save_all` runs in one transaction, so a decay sweep lands whole or not at all.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use super::RecordStore;
use crate::config::PersistenceConfig;
use crate::error::StoreResult;
use crate::types::{OwnerId, PetRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pets (
    owner_id   TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

const UPSERT: &str = "INSERT INTO pets (owner_id, data, updated_at, checksum)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(owner_id) DO UPDATE SET
        data = excluded.data,
        updated_at = excluded.updated_at,
        checksum = excluded.checksum";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database of pets.
///
/// ```no_run
/// # use petpal_core::store::{RecordStore, SqliteStore};
/// # use petpal_core::config::PersistenceConfig;
/// # use petpal_core::species::Species;
/// # use petpal_core::types::{OwnerId, PetRecord};
/// let store = SqliteStore::open("petpal.db", &PersistenceConfig::default())?;
/// let owner = OwnerId::from("1234");
/// store.save(&owner, &PetRecord::new(Species::Bird, chrono::Utc::now()))?;
/// let loaded = store.load(&owner)?;
/// # Ok::<(), petpal_core::error::StoreError>(())
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "SQLite pet store opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn encode(&self, record: &PetRecord) -> StoreResult<(Vec<u8>, Option<String>)> {
        let json = serde_json::to_vec(record)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        Ok((json, checksum))
    }

    fn decode(&self, owner: &str, data: &[u8], stored_checksum: Option<&str>) -> StoreResult<PetRecord> {
        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(data);
                if expected != actual {
                    warn!(
                        owner = %owner,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }
        Ok(serde_json::from_slice(data)?)
    }

    /// Number of stored pets.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn pet_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM pets", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` using SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> StoreResult<()> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&*conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Database backup completed"
        );
        Ok(())
    }

    /// Create `<db>.bak.1`, shifting older backups up and keeping at most
    /// `config.backup_count`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` or `StoreError::Io` on failure.
    pub fn create_rotating_backup(&self) -> StoreResult<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }

        let max = self.config.backup_count;
        if max == 0 {
            return Ok(());
        }

        for i in (1..max).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                std::fs::rename(&src, &dst)?;
            }
        }

        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }

        self.backup(self.backup_path(1))?;
        info!(max_backups = max, "Rotating backup created");
        Ok(())
    }

    /// Path to a numbered backup file (e.g. `petpal.db.bak.1`).
    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the check itself fails.
    pub fn integrity_check(&self) -> StoreResult<bool> {
        let result: String = self
            .conn
            .lock()
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl RecordStore for SqliteStore {
    fn load_all(&self) -> StoreResult<Vec<(OwnerId, PetRecord)>> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT owner_id, data, checksum FROM pets")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (owner, data, checksum) = row?;
            let record = self.decode(&owner, &data, checksum.as_deref())?;
            records.push((OwnerId(owner), record));
        }

        debug!(
            pets = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded all pets"
        );
        Ok(records)
    }

    fn load(&self, owner: &OwnerId) -> StoreResult<Option<PetRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT data, checksum FROM pets WHERE owner_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![owner.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, checksum)) = row else {
            return Ok(None);
        };
        self.decode(owner.as_str(), &data, checksum.as_deref()).map(Some)
    }

    fn save(&self, owner: &OwnerId, record: &PetRecord) -> StoreResult<()> {
        let (json, checksum) = self.encode(record)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .lock()
            .execute(UPSERT, params![owner.as_str(), json, now, checksum])?;
        debug!(owner = %owner, bytes = json.len(), "Saved pet");
        Ok(())
    }

    fn save_all(&self, records: &[(OwnerId, PetRecord)]) -> StoreResult<()> {
        let start = Instant::now();
        let encoded = records
            .iter()
            .map(|(owner, record)| self.encode(record).map(|enc| (owner, enc)))
            .collect::<StoreResult<Vec<_>>>()?;

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for (owner, (json, checksum)) in &encoded {
                stmt.execute(params![owner.as_str(), json, now, checksum])?;
            }
        }
        tx.commit()?;

        debug!(
            pets = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved pets in one transaction"
        );
        Ok(())
    }

    fn delete(&self, owner: &OwnerId) -> StoreResult<bool> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM pets WHERE owner_id = ?1", params![owner.as_str()])?;
        Ok(deleted > 0)
    }

    /// Rotating backup, skipped when the live database fails its integrity
    /// check so a corrupt copy never pushes out a good one.
    fn snapshot(&self) -> StoreResult<()> {
        if !self.integrity_check()? {
            warn!(path = %self.db_path.display(), "Integrity check failed; backup skipped");
            return Ok(());
        }
        self.create_rotating_backup()
    }
}

/// Converts `Err(QueryReturnedNoRows)` into `Ok(None)`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Species;
    use crate::error::StoreError;

    fn test_config() -> PersistenceConfig {
        PersistenceConfig {
            checksum_enabled: true,
            ..PersistenceConfig::default()
        }
    }

    fn sample_pet() -> PetRecord {
        let mut pet = PetRecord::new(Species::Hampter, Utc::now());
        pet.name = "nibbles".to_string();
        pet.level = 6;
        pet.xp = 120;
        pet.evolution_stage = 1;
        pet.current_form = "guinea pig".to_string();
        pet.coins = 17;
        pet
    }

    #[test]
    fn round_trip_save_load() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let owner = OwnerId::from("1");
        let pet = sample_pet();

        store.save(&owner, &pet).expect("save");
        let loaded = store.load(&owner).expect("load").expect("Some");
        assert_eq!(loaded, pet);
    }

    #[test]
    fn load_nonexistent_returns_none() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        assert!(store.load(&OwnerId::from("ghost")).expect("load").is_none());
    }

    #[test]
    fn upsert_overwrites() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let owner = OwnerId::from("1");

        store.save(&owner, &sample_pet()).expect("save1");
        let mut renamed = sample_pet();
        renamed.name = "squeak".to_string();
        store.save(&owner, &renamed).expect("save2");

        let loaded = store.load(&owner).expect("load").expect("Some");
        assert_eq!(loaded.name, "squeak");
        assert_eq!(store.pet_count().expect("count"), 1);
    }

    #[test]
    fn delete_works() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let owner = OwnerId::from("1");

        store.save(&owner, &sample_pet()).expect("save");
        assert!(store.delete(&owner).expect("delete"));
        assert!(!store.delete(&owner).expect("delete again"));
        assert!(store.load(&owner).expect("load").is_none());
    }

    #[test]
    fn save_all_and_load_all() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let records: Vec<_> = (1..=3_u64)
            .map(|i| (OwnerId::from(i), sample_pet()))
            .collect();

        store.save_all(&records).expect("save_all");
        let mut loaded = store.load_all().expect("load_all");
        loaded.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(loaded, records);
    }

    #[test]
    fn checksum_mismatch_still_loads() {
        // The mismatch is only logged; the record still comes back.
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        let owner = OwnerId::from("1");
        store.save(&owner, &sample_pet()).expect("save");

        store
            .conn
            .lock()
            .execute(
                "UPDATE pets SET checksum = 'deadbeef' WHERE owner_id = ?1",
                params![owner.as_str()],
            )
            .expect("corrupt checksum");

        let loaded = store.load(&owner).expect("load").expect("Some");
        assert_eq!(loaded.coins, 17);
    }

    #[test]
    fn garbage_data_is_a_serialization_error() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO pets (owner_id, data, updated_at) VALUES ('x', X'00', 'now')",
                [],
            )
            .expect("insert garbage");

        assert!(matches!(
            store.load(&OwnerId::from("x")),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn integrity_check_passes() {
        let store = SqliteStore::open_in_memory(&test_config()).expect("open");
        assert!(store.integrity_check().expect("check"));
    }

    #[test]
    fn file_based_open_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config();
        let store = SqliteStore::open(dir.path().join("petpal.db"), &config).expect("open");
        assert_eq!(store.db_path(), dir.path().join("petpal.db"));
        let owner = OwnerId::from("1");
        let pet = sample_pet();
        store.save(&owner, &pet).expect("save");

        let backup_path = dir.path().join("petpal_backup.db");
        store.backup(&backup_path).expect("backup");

        let restored = SqliteStore::open(&backup_path, &config).expect("open backup");
        assert_eq!(restored.load(&owner).expect("load"), Some(pet));
    }

    #[test]
    fn rotating_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = test_config();
        config.backup_count = 2;

        let store = SqliteStore::open(dir.path().join("petpal.db"), &config).expect("open");
        store.save(&OwnerId::from("1"), &sample_pet()).expect("save");

        store.create_rotating_backup().expect("backup 1");
        store.create_rotating_backup().expect("backup 2");
        store.create_rotating_backup().expect("backup 3");

        assert!(dir.path().join("petpal.db.bak.1").exists());
        assert!(dir.path().join("petpal.db.bak.2").exists());
        assert!(!dir.path().join("petpal.db.bak.3").exists());
    }

    #[test]
    fn snapshot_rotates_through_the_trait() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: Box<dyn RecordStore> = Box::new(
            SqliteStore::open(dir.path().join("petpal.db"), &test_config()).expect("open"),
        );
        store.save(&OwnerId::from("1"), &sample_pet()).expect("save");
        store.snapshot().expect("snapshot");
        assert!(dir.path().join("petpal.db.bak.1").exists());
    }

    #[test]
    fn crc32_basic() {
        // Known test vector: CRC-32 of "123456789" = 0xCBF43926
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
