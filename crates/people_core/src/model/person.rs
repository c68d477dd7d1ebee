//! Person domain model.
//!
//! # Responsibility
//! - Define the stored record (`Person`), the insert shape (`NewPerson`) and
//!   the partial update shape (`PersonPatch`).
//!
//! # Invariants
//! - `id` is immutable once assigned.
//! - Any `name` and any `age` are valid values, including `""` and
//!   negatives.

use serde::{Deserialize, Serialize};

/// Store-assigned row identifier.
pub type PersonId = i64;

/// One row of the people table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub age: i64,
}

/// Insert payload. Carries no id; the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub age: i64,
}

/// Partial update payload. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }
}

impl Person {
    /// Returns a copy with every field present in `patch` replaced.
    ///
    /// `id` is never touched.
    pub fn patched(&self, patch: &PersonPatch) -> Self {
        Self {
            id: self.id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            age: patch.age.unwrap_or(self.age),
        }
    }
}

impl PersonPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            age: None,
        }
    }

    pub fn age(age: i64) -> Self {
        Self {
            name: None,
            age: Some(age),
        }
    }

    /// Returns whether this patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none()
    }
}
