use super::RecordStore;
use super::persistence::{DurabilityMode, PersistenceManager, WalEntry};
use crate::core::{Record, RecordDraft, RecordId, Result};
use crate::query::RecordQuery;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Record collection held in memory, optionally backed by a WAL + snapshot.
///
/// Every mutation takes the records write lock first and the persistence
/// lock second, so the log order always matches the in-memory order.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, Record>>,
    persistence: Option<Mutex<PersistenceManager>>,
}

impl InMemoryRecordStore {
    /// Purely in-memory store; contents are lost when the process exits.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            persistence: None,
        }
    }

    /// Open (or create) a durable store in `data_dir`, recovering previous contents.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        durability_mode: DurabilityMode,
        checkpoint_threshold: usize,
    ) -> Result<Self> {
        if durability_mode == DurabilityMode::None {
            return Ok(Self::new());
        }

        let mut persistence = PersistenceManager::new(data_dir.as_ref(), durability_mode)?;
        persistence
            .wal_mut()
            .set_checkpoint_threshold(checkpoint_threshold);
        let records = persistence.recover()?;

        info!(
            data_dir = %data_dir.as_ref().display(),
            records = records.len(),
            ?durability_mode,
            "record store recovered"
        );

        Ok(Self {
            records: RwLock::new(records),
            persistence: Some(Mutex::new(persistence)),
        })
    }

    pub fn is_durable(&self) -> bool {
        self.persistence.is_some()
    }

    /// Appends to the WAL after `records` already reflects the entry, so an
    /// automatic checkpoint captures it.
    async fn log(&self, entry: &WalEntry, records: &HashMap<RecordId, Record>) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let mut persistence = persistence.lock().await;
        persistence.log(entry)?;
        if persistence.needs_checkpoint() {
            // the entry is already in the WAL, so a failed snapshot loses nothing
            if let Err(err) = persistence.checkpoint(records) {
                warn!(error = %err, "automatic checkpoint failed, WAL retained");
            }
        }
        Ok(())
    }

    /// Snapshots `records` when an earlier failed append left the WAL
    /// unwritable. Runs before a mutation, while `records` matches disk.
    async fn restore_wal(&self, records: &HashMap<RecordId, Record>) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let mut persistence = persistence.lock().await;
        if persistence.needs_recovery_checkpoint() {
            persistence.checkpoint(records)?;
            info!(records = records.len(), "WAL restored by checkpoint");
        }
        Ok(())
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        let mut found: Vec<Record> = records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        query.sort(&mut found);
        Ok(found)
    }

    async fn find_one(&self, record_id: RecordId) -> Result<Option<Record>> {
        let records = self.records.read().await;
        Ok(records.get(&record_id).cloned())
    }

    async fn insert(&self, draft: RecordDraft) -> Result<Record> {
        let mut records = self.records.write().await;
        self.restore_wal(&records).await?;
        let record = Record::from_draft(RecordId::new(), draft, Utc::now());
        records.insert(record.record_id, record.clone());

        if let Err(err) = self.log(&WalEntry::Insert(record.clone()), &records).await {
            records.remove(&record.record_id);
            return Err(err);
        }

        debug!(record_id = %record.record_id, "record inserted");
        Ok(record)
    }

    async fn replace(&self, record_id: RecordId, draft: RecordDraft) -> Result<Option<Record>> {
        let mut records = self.records.write().await;
        self.restore_wal(&records).await?;
        let Some(existing) = records.get_mut(&record_id) else {
            return Ok(None);
        };

        let previous = existing.clone();
        existing.overwrite(draft, Utc::now());
        let updated = existing.clone();

        if let Err(err) = self.log(&WalEntry::Replace(updated.clone()), &records).await {
            records.insert(record_id, previous);
            return Err(err);
        }

        debug!(record_id = %record_id, "record replaced");
        Ok(Some(updated))
    }

    async fn delete(&self, record_id: RecordId) -> Result<usize> {
        let mut records = self.records.write().await;
        self.restore_wal(&records).await?;
        let Some(removed) = records.remove(&record_id) else {
            return Ok(0);
        };

        if let Err(err) = self.log(&WalEntry::Delete(record_id), &records).await {
            records.insert(record_id, removed);
            return Err(err);
        }

        debug!(record_id = %record_id, "record deleted");
        Ok(1)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn checkpoint(&self) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let records = self.records.read().await;
        persistence.lock().await.checkpoint(&records)
    }
}
