// src/models/core.rs

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// Identifier of an input record.
///
/// Source files carry either integer or free-text ids. Wherever ids of mixed
/// kinds have to be ordered they are compared by their string form, so
/// `Int(10)` sorts before `Int(9)` and next to `Text("10")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Parses a raw cell value: trimmed, integer when it parses as one, text otherwise.
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<i64>() {
            Ok(value) => RecordId::Int(value),
            Err(_) => RecordId::Text(trimmed.to_string()),
        })
    }

    /// String form used for ordering and pair canonicalization.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            RecordId::Int(value) => Cow::Owned(value.to_string()),
            RecordId::Text(value) => Cow::Borrowed(value.as_str()),
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            RecordId::Int(_) => 0,
            RecordId::Text(_) => 1,
        }
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_key()
            .cmp(&other.as_key())
            .then_with(|| self.variant_rank().cmp(&other.variant_rank()))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(value) => write!(f, "{}", value),
            RecordId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Text(value)
    }
}

/// A single company row as loaded from the input file. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub company_name: String,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, company_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_name: company_name.into(),
        }
    }
}
