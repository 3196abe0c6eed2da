use std::cmp::Ordering;
use std::fmt;

/// A stored field as seen by filter comparisons.
///
/// Record fields are kept as the text the user typed. Numeric fields are
/// promoted to `Number` when the text parses as a finite number, so that
/// `"9" < "10"` holds for scores.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Text(&'a str),
    Number { raw: &'a str, value: f64 },
}

impl<'a> Value<'a> {
    pub fn text(raw: &'a str) -> Self {
        Self::Text(raw)
    }

    /// Promotes `raw` to a number when the whole text parses as one,
    /// otherwise keeps it as text. Surrounding whitespace is not stripped.
    pub fn numeric(raw: &'a str) -> Self {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Number { raw, value },
            _ => Self::Text(raw),
        }
    }

    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Text(raw) | Self::Number { raw, .. } => raw,
        }
    }

    pub fn compare(&self, other: &Value<'_>) -> Ordering {
        match (self, other) {
            (Self::Number { value: a, .. }, Value::Number { value: b, .. }) => {
                // both sides are finite
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            // Mixed or textual: byte-wise on what the user typed
            _ => self.as_str().cmp(other.as_str()),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Value<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
