use super::{Result, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Storage-assigned identity of a record.
///
/// Distinct from the user-supplied `id` field, which carries no uniqueness
/// guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RecordId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| StoreError::InvalidId(format!("'{}' is not a valid record identifier", s)))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// User-editable part of a record, as submitted through a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub id: String,
    pub score: String,
}

impl RecordDraft {
    pub fn new(name: impl Into<String>, id: impl Into<String>, score: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            score: score.into(),
        }
    }
}

/// One student-score entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub name: String,
    pub id: String,
    pub score: String,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn from_draft(record_id: RecordId, draft: RecordDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            record_id,
            name: draft.name,
            id: draft.id,
            score: draft.score,
            created_at,
        }
    }

    /// Overwrites every user field and the timestamp. Nothing is merged.
    pub fn overwrite(&mut self, draft: RecordDraft, created_at: DateTime<Utc>) {
        self.name = draft.name;
        self.id = draft.id;
        self.score = draft.score;
        self.created_at = created_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_round_trips_through_text() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_record_id_rejects_garbage() {
        let err = "not-an-id".parse::<RecordId>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_overwrite_replaces_all_fields() {
        let created = Utc::now();
        let mut record = Record::from_draft(
            RecordId::new(),
            RecordDraft::new("Bo", "1", "90"),
            created,
        );
        let later = created + chrono::Duration::seconds(5);
        record.overwrite(RecordDraft::new("", "2", ""), later);

        assert_eq!(record.name, "");
        assert_eq!(record.id, "2");
        assert_eq!(record.score, "");
        assert_eq!(record.created_at, later);
    }
}
