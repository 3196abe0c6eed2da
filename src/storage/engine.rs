use crate::core::{Record, RecordDraft, RecordId, Result};
use crate::query::RecordQuery;
use async_trait::async_trait;

/// Record store trait - one collection of student-score records.
///
/// Handlers only see this trait; the concrete store is chosen at startup and
/// shared through `AppState`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching the query's predicate, in the query's order
    async fn find(&self, query: &RecordQuery) -> Result<Vec<Record>>;

    /// Look up a record by its storage identifier
    async fn find_one(&self, record_id: RecordId) -> Result<Option<Record>>;

    /// Insert a new record stamped with the current time
    async fn insert(&self, draft: RecordDraft) -> Result<Record>;

    /// Overwrite every field of an existing record, re-stamping it.
    /// Returns `None` when no record has this identifier.
    async fn replace(&self, record_id: RecordId, draft: RecordDraft) -> Result<Option<Record>>;

    /// Remove a record. Returns the number of records removed (0 or 1).
    async fn delete(&self, record_id: RecordId) -> Result<usize>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// Flush durable state, if any
    async fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}
