use super::filter::{CompareOp, Field, FilterExpr, ParsedQuery};
use crate::core::Record;
use std::cmp::Ordering;

/// A single-field comparison evaluated against stored records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    field: Field,
    op: CompareOp,
    operand: String,
}

impl Predicate {
    pub fn new(field: Field, op: CompareOp, operand: impl Into<String>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &str {
        &self.operand
    }

    pub fn matches(&self, record: &Record) -> bool {
        let stored = self.field.read(record);
        let operand = self.field.value_of(&self.operand);
        self.op.accepts(stored.compare(&operand))
    }
}

impl From<FilterExpr> for Predicate {
    fn from(expr: FilterExpr) -> Self {
        Self::new(expr.field, expr.op, expr.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    /// The user-supplied `id`, compared as text.
    UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl SortSpec {
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = match self.key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UserId => a
                .id
                .cmp(&b.id)
                .then_with(|| a.created_at.cmp(&b.created_at)),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// What the record store is asked for: an optional predicate plus an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub predicate: Option<Predicate>,
    pub order: SortSpec,
}

impl RecordQuery {
    /// Plain listing: everything, newest first.
    pub fn newest_first() -> Self {
        Self {
            predicate: None,
            order: SortSpec {
                key: SortKey::CreatedAt,
                descending: true,
            },
        }
    }

    /// A submitted query line, filtered or not, is ordered by the user `id`.
    pub fn from_parsed(parsed: ParsedQuery) -> Self {
        let predicate = match parsed {
            ParsedQuery::Unfiltered => None,
            ParsedQuery::Filter(expr) => Some(Predicate::from(expr)),
        };
        Self {
            predicate,
            order: SortSpec {
                key: SortKey::UserId,
                descending: false,
            },
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicate
            .as_ref()
            .is_none_or(|predicate| predicate.matches(record))
    }

    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.order.compare(a, b));
    }
}
