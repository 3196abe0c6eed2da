//! Single-operator filter expressions such as `score>=80` or `name=Ann`.
//!
//! The grammar is one allow-listed field, one comparison operator and a raw
//! text value, with no whitespace handling:
//!
//! ```text
//! expr  := ""                       (no filter)
//!        | field op value
//! field := "name" | "id" | "score"
//! op    := "<=" | ">=" | "=" | "<" | ">"
//! ```
//!
//! The line is split at the first occurrence of the first operator found in
//! probe order, so a field or value that itself contains an operator
//! substring may be split somewhere unexpected.

use crate::core::{Record, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const UNSUPPORTED_OPERATION_MESSAGE: &str = "Sorry, System does not support this operation!";
pub const UNKNOWN_FIELD_MESSAGE: &str = "Sorry, your key does not exist!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{}", UNSUPPORTED_OPERATION_MESSAGE)]
    UnsupportedOperation { input: String },

    #[error("{}", UNKNOWN_FIELD_MESSAGE)]
    UnknownField { field: String },
}

// ============================================================================
// Fields
// ============================================================================

/// Record fields a filter may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Id,
    Score,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Id, Field::Score];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Id => "id",
            Self::Score => "score",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Score)
    }

    /// Interprets `raw` with this field's comparison semantics.
    pub fn value_of<'a>(&self, raw: &'a str) -> Value<'a> {
        if self.is_numeric() {
            Value::numeric(raw)
        } else {
            Value::text(raw)
        }
    }

    pub fn read<'r>(&self, record: &'r Record) -> Value<'r> {
        let raw = match self {
            Self::Name => record.name.as_str(),
            Self::Id => record.id.as_str(),
            Self::Score => record.score.as_str(),
        };
        self.value_of(raw)
    }
}

impl FromStr for Field {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| FilterError::UnknownField {
                field: s.to_string(),
            })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    /// `<=` and `>=` both contain `=`, so they are probed before it.
    pub const PROBE_ORDER: [CompareOp; 5] = [
        CompareOp::LtEq,
        CompareOp::GtEq,
        CompareOp::Eq,
        CompareOp::Lt,
        CompareOp::Gt,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        }
    }

    /// Whether `stored.compare(operand)` satisfies the operator.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
            Self::LtEq => ordering != Ordering::Greater,
            Self::GtEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub field: Field,
    pub op: CompareOp,
    pub value: String,
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op, self.value)
    }
}

/// Result of parsing the read page's query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    /// Empty input: every record, in the default submitted-query order.
    Unfiltered,
    Filter(FilterExpr),
}

impl ParsedQuery {
    pub fn parse(line: &str) -> Result<Self, FilterError> {
        if line.is_empty() {
            return Ok(Self::Unfiltered);
        }

        let (op, at) = CompareOp::PROBE_ORDER
            .iter()
            .find_map(|op| line.find(op.symbol()).map(|at| (*op, at)))
            .ok_or_else(|| FilterError::UnsupportedOperation {
                input: line.to_string(),
            })?;

        let field = line[..at].parse::<Field>()?;
        let value = line[at + op.symbol().len()..].to_string();

        Ok(Self::Filter(FilterExpr { field, op, value }))
    }

    pub fn filter(&self) -> Option<&FilterExpr> {
        match self {
            Self::Unfiltered => None,
            Self::Filter(expr) => Some(expr),
        }
    }
}

impl FromStr for ParsedQuery {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
