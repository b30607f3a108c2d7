//! The book record used throughout the documentation, tests and demo.

use serde::{Deserialize, Serialize};

/// A catalogue entry.
///
/// Stored as an object with exactly the fields `isbn`, `name` and `cost`, all
/// strings. The cost is kept in its decimal text form and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct Book {
    pub isbn: String,
    pub name: String,
    pub cost: String,
}

impl Book {
    pub fn new(isbn: impl Into<String>, name: impl Into<String>, cost: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            name: name.into(),
            cost: cost.into(),
        }
    }
}
