//! Write-ahead log and snapshot files for the record store

use crate::core::{Record, RecordId, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const WAL_FILE_NAME: &str = "records.wal";
const SNAPSHOT_FILE_NAME: &str = "records.snapshot";
const SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_CHECKPOINT_THRESHOLD: usize = 1000;

// ============================================================================
// WAL Entry Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalEntry {
    Insert(Record),
    Replace(Record),
    Delete(RecordId),
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub records: Vec<Record>,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: u64,
    pub record_count: usize,
}

impl StoreSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            version: SNAPSHOT_VERSION,
            metadata: SnapshotMetadata {
                created_at,
                record_count: records.len(),
            },
            records,
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every WAL append
    Sync,
    /// flush to the OS after every append
    #[default]
    Async,
    /// keep everything in memory
    None,
}

impl FromStr for DurabilityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "none" | "memory" => Ok(Self::None),
            other => Err(format!(
                "durability must be one of: sync, async, none (got '{}')",
                other
            )),
        }
    }
}

fn io_error(context: &str, err: std::io::Error) -> StoreError {
    StoreError::IoError(format!("{}: {}", context, err))
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

// ============================================================================
// WAL Manager
// ============================================================================

pub struct WalManager {
    wal_path: PathBuf,
    wal_file: Option<File>,
    durability_mode: DurabilityMode,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
    /// Length of the file up to the end of the last successful append.
    committed_len: u64,
    /// Set when a failed append could not be cut back out of the file.
    poisoned: bool,
}

impl WalManager {
    /// Opens the WAL for appending. A torn tail left by a crash is cut off
    /// so that later appends stay readable.
    pub fn new<P: AsRef<Path>>(wal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("Failed to create WAL directory", e))?;
        }

        let mut wal = Self {
            wal_path,
            wal_file: None,
            durability_mode,
            entries_since_checkpoint: 0,
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
            committed_len: 0,
            poisoned: false,
        };
        if durability_mode == DurabilityMode::None {
            return Ok(wal);
        }

        let file = open_append(&wal.wal_path).map_err(|e| io_error("Failed to open WAL file", e))?;
        let file_len = file
            .metadata()
            .map_err(|e| io_error("Failed to stat WAL file", e))?
            .len();
        let (_, valid_len) = wal.scan()?;
        if valid_len < file_len {
            warn!(
                path = %wal.wal_path.display(),
                dropped_bytes = file_len - valid_len,
                "truncating torn WAL tail"
            );
            file.set_len(valid_len)
                .map_err(|e| io_error("Failed to truncate torn WAL tail", e))?;
        }
        wal.committed_len = valid_len;
        wal.wal_file = Some(file);
        Ok(wal)
    }

    /// Appends one entry. On failure the file is cut back to its previous
    /// length, so a rejected entry is never replayed.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        if self.poisoned {
            return Err(StoreError::IoError(
                "WAL is refusing writes until the next checkpoint".to_string(),
            ));
        }
        let serialized = rmp_serde::to_vec(entry)
            .map_err(|e| StoreError::CodecError(format!("Failed to serialize WAL entry: {}", e)))?;
        let mut frame = Vec::with_capacity(4 + serialized.len());
        frame.extend_from_slice(&(serialized.len() as u32).to_le_bytes());
        frame.extend_from_slice(&serialized);

        if let Err(err) = self.write_frame(&frame) {
            self.rollback();
            return Err(err);
        }
        self.committed_len += frame.len() as u64;
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let file = self
            .wal_file
            .as_mut()
            .ok_or_else(|| StoreError::IoError("WAL file not initialized".to_string()))?;
        file.write_all(frame)
            .map_err(|e| io_error("Failed to write WAL", e))?;
        if self.durability_mode == DurabilityMode::Sync {
            file.sync_data()
                .map_err(|e| io_error("Failed to sync WAL", e))?;
        }
        Ok(())
    }

    /// Drops the writer, cuts the file back to `committed_len` and reopens it.
    fn rollback(&mut self) {
        self.wal_file = None;
        let committed_len = self.committed_len;
        let restored = open_append(&self.wal_path).and_then(|file| {
            file.set_len(committed_len)?;
            file.sync_all()?;
            Ok(file)
        });
        match restored {
            Ok(file) => self.wal_file = Some(file),
            Err(err) => {
                warn!(
                    path = %self.wal_path.display(),
                    error = %err,
                    "failed to roll back WAL, writes refused until checkpoint"
                );
                self.poisoned = true;
            }
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Reads every complete entry. A torn final entry (crash mid-append) is
    /// dropped; an entry that is complete but undecodable is an error.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        self.scan().map(|(entries, _)| entries)
    }

    /// Complete entries plus the byte length they occupy.
    fn scan(&self) -> Result<(Vec<WalEntry>, u64)> {
        if !self.wal_path.exists() {
            return Ok((Vec::new(), 0));
        }
        let file = File::open(&self.wal_path)
            .map_err(|e| io_error("Failed to open WAL for reading", e))?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut valid_len = 0u64;
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(io_error("Failed to read WAL entry length", e)),
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    warn!(path = %self.wal_path.display(), "dropping torn WAL tail");
                    break;
                }
                Err(e) => return Err(io_error("Failed to read WAL entry data", e)),
            }
            let entry: WalEntry = rmp_serde::from_slice(&data).map_err(|e| {
                StoreError::Corrupted(format!("Failed to deserialize WAL entry: {}", e))
            })?;
            entries.push(entry);
            valid_len += 4 + len as u64;
        }
        Ok((entries, valid_len))
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.wal_file = None;
        let file = open_append(&self.wal_path)
            .and_then(|file| file.set_len(0).map(|()| file))
            .map_err(|e| io_error("Failed to truncate WAL", e))?;
        self.wal_file = Some(file);
        self.entries_since_checkpoint = 0;
        self.committed_len = 0;
        self.poisoned = false;
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold.max(1);
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temp file and renames it over the old snapshot.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| io_error("Failed to create snapshot directory", e))?;
        }
        let temp_path = self.snapshot_path.with_extension("tmp");
        let temp_file =
            File::create(&temp_path).map_err(|e| io_error("Failed to create temp file", e))?;
        let mut writer = BufWriter::new(temp_file);
        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| StoreError::CodecError(format!("Failed to serialize snapshot: {}", e)))?;
        writer
            .write_all(&serialized)
            .map_err(|e| io_error("Failed to write snapshot", e))?;
        writer
            .flush()
            .map_err(|e| io_error("Failed to flush snapshot", e))?;
        writer
            .get_mut()
            .sync_all()
            .map_err(|e| io_error("Failed to sync snapshot", e))?;
        fs::rename(&temp_path, &self.snapshot_path)
            .map_err(|e| io_error("Failed to rename snapshot", e))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.exists() {
            return Ok(None);
        }
        let mut file =
            File::open(&self.snapshot_path).map_err(|e| io_error("Failed to open snapshot", e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| io_error("Failed to read snapshot", e))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| StoreError::Corrupted(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corrupted(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    wal: WalManager,
    snapshot: SnapshotManager,
    durability_mode: DurabilityMode,
}

impl PersistenceManager {
    pub fn new<P: AsRef<Path>>(data_dir: P, durability_mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let wal = WalManager::new(data_dir.join(WAL_FILE_NAME), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(SNAPSHOT_FILE_NAME));
        Ok(Self {
            wal,
            snapshot,
            durability_mode,
        })
    }

    pub fn log(&mut self, entry: &WalEntry) -> Result<()> {
        self.wal.append(entry)
    }

    pub fn checkpoint(&mut self, records: &HashMap<RecordId, Record>) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let snapshot = StoreSnapshot::new(records.values().cloned().collect());
        self.snapshot.save(&snapshot)?;
        self.wal.clear()?;
        debug!(records = records.len(), "checkpoint written");
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.wal.needs_checkpoint()
    }

    /// True after a failed append could not be rolled back; only a
    /// checkpoint makes the WAL writable again.
    pub fn needs_recovery_checkpoint(&self) -> bool {
        self.wal.is_poisoned()
    }

    /// Snapshot contents with the WAL replayed on top.
    pub fn recover(&self) -> Result<HashMap<RecordId, Record>> {
        let mut records: HashMap<RecordId, Record> = match self.snapshot.load()? {
            Some(snapshot) => snapshot
                .records
                .into_iter()
                .map(|record| (record.record_id, record))
                .collect(),
            None => HashMap::new(),
        };

        for entry in self.wal.read_all()? {
            match entry {
                WalEntry::Insert(record) | WalEntry::Replace(record) => {
                    records.insert(record.record_id, record);
                }
                WalEntry::Delete(record_id) => {
                    records.remove(&record_id);
                }
            }
        }
        Ok(records)
    }

    pub fn wal_mut(&mut self) -> &mut WalManager {
        &mut self.wal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordDraft;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(name: &str) -> Record {
        Record::from_draft(RecordId::new(), RecordDraft::new(name, "1", "90"), Utc::now())
    }

    #[test]
    fn test_wal_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut wal = WalManager::new(temp_dir.path().join("test.wal"), DurabilityMode::Sync).unwrap();
        let bo = record("Bo");
        wal.append(&WalEntry::Insert(bo.clone())).unwrap();
        wal.append(&WalEntry::Delete(bo.record_id)).unwrap();

        let entries = wal.read_all().unwrap();
        assert_eq!(entries, vec![WalEntry::Insert(bo.clone()), WalEntry::Delete(bo.record_id)]);
    }

    #[test]
    fn test_torn_tail_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");
        let mut wal = WalManager::new(&wal_path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::Insert(record("Bo"))).unwrap();
        drop(wal);

        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(&64u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let mut wal = WalManager::new(&wal_path, DurabilityMode::Sync).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 1);

        // the torn bytes are gone, so new entries stay readable
        wal.append(&WalEntry::Insert(record("Cy"))).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 2);
    }

    fn inserted_names(wal: &WalManager) -> Vec<String> {
        wal.read_all()
            .unwrap()
            .into_iter()
            .map(|entry| match entry {
                WalEntry::Insert(record) => record.name,
                other => panic!("unexpected entry {other:?}"),
            })
            .collect()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_append_is_cut_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");
        let mut wal = WalManager::new(&wal_path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::Insert(record("Ann"))).unwrap();

        // part of the failed entry already reached the file
        let mut partial = OpenOptions::new().append(true).open(&wal_path).unwrap();
        partial.write_all(&[9, 9, 9]).unwrap();
        wal.wal_file = Some(OpenOptions::new().write(true).open("/dev/full").unwrap());
        assert!(wal.append(&WalEntry::Insert(record("ghost"))).is_err());
        assert!(!wal.is_poisoned());

        wal.append(&WalEntry::Insert(record("Bo"))).unwrap();
        assert_eq!(inserted_names(&wal), ["Ann", "Bo"]);
        assert_eq!(wal.entries_since_checkpoint, 2);

        let reopened = WalManager::new(&wal_path, DurabilityMode::Sync).unwrap();
        assert_eq!(inserted_names(&reopened), ["Ann", "Bo"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unrecoverable_append_refuses_writes_until_clear() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");
        let mut wal = WalManager::new(&wal_path, DurabilityMode::Sync).unwrap();

        // rollback cannot reopen a path whose directory does not exist
        wal.wal_path = temp_dir.path().join("missing").join("test.wal");
        wal.wal_file = Some(OpenOptions::new().write(true).open("/dev/full").unwrap());
        assert!(wal.append(&WalEntry::Insert(record("ghost"))).is_err());
        assert!(wal.is_poisoned());

        wal.wal_path = wal_path;
        assert!(wal.append(&WalEntry::Insert(record("Bo"))).is_err());

        wal.clear().unwrap();
        assert!(!wal.is_poisoned());
        wal.append(&WalEntry::Insert(record("Cy"))).unwrap();
        assert_eq!(inserted_names(&wal), ["Cy"]);
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_mgr = SnapshotManager::new(temp_dir.path().join("test.snapshot"));
        snapshot_mgr
            .save(&StoreSnapshot::new(vec![record("Ann"), record("Bo")]))
            .unwrap();
        assert!(snapshot_mgr.exists());

        let loaded = snapshot_mgr.load().unwrap().unwrap();
        assert_eq!(loaded.metadata.record_count, 2);
        assert_eq!(loaded.records.len(), 2);
    }

    #[test]
    fn test_checkpoint_clears_wal() {
        let temp_dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::new(temp_dir.path(), DurabilityMode::Sync).unwrap();
        let bo = record("Bo");
        persistence.log(&WalEntry::Insert(bo.clone())).unwrap();
        assert_eq!(persistence.wal.entries_since_checkpoint, 1);

        let records = HashMap::from([(bo.record_id, bo)]);
        persistence.checkpoint(&records).unwrap();
        assert_eq!(persistence.wal.entries_since_checkpoint, 0);
        assert!(persistence.wal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_recovery_replays_wal_over_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::new(temp_dir.path(), DurabilityMode::Sync).unwrap();

        let ann = record("Ann");
        let bo = record("Bo");
        persistence
            .checkpoint(&HashMap::from([(ann.record_id, ann.clone())]))
            .unwrap();

        let mut renamed = ann.clone();
        renamed.name = "Anna".to_string();
        persistence.log(&WalEntry::Replace(renamed)).unwrap();
        persistence.log(&WalEntry::Insert(bo.clone())).unwrap();
        persistence.log(&WalEntry::Delete(bo.record_id)).unwrap();

        let recovered = persistence.recover().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[&ann.record_id].name, "Anna");
    }

    #[test]
    fn test_durability_mode_parsing() {
        assert_eq!("SYNC".parse::<DurabilityMode>(), Ok(DurabilityMode::Sync));
        assert_eq!("memory".parse::<DurabilityMode>(), Ok(DurabilityMode::None));
        assert!("often".parse::<DurabilityMode>().is_err());
    }
}
