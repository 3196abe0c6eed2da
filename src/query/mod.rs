//! Read-page query language: parsing and evaluation.

mod filter;
mod predicate;

pub use filter::{
    CompareOp, Field, FilterError, FilterExpr, ParsedQuery, UNKNOWN_FIELD_MESSAGE,
    UNSUPPORTED_OPERATION_MESSAGE,
};
pub use predicate::{Predicate, RecordQuery, SortKey, SortSpec};
