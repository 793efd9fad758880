//! Row-level mutation kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of row-level mutation recorded in the change log.
///
/// Stored and transmitted as a single letter: `"I"`, `"U"` or `"D"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Row was inserted.
    #[serde(rename = "I")]
    Insert,
    /// Row was updated.
    #[serde(rename = "U")]
    Update,
    /// Row was deleted.
    #[serde(rename = "D")]
    Delete,
}

impl Operation {
    /// Returns the single-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Operation::Insert => "I",
            Operation::Update => "U",
            Operation::Delete => "D",
        }
    }

    /// Converts from a single-letter code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(Operation::Insert),
            "U" => Some(Operation::Update),
            "D" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Returns true if a change record for this operation carries row data.
    pub fn carries_data(&self) -> bool {
        !matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
