//! Request, response and error types of the person provider.

use crate::model::person::{NewPerson, Person, PersonId, PersonPatch};
use crate::provider::selector::DeleteSelector;
use crate::repo::person_repo::StoreError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider-level failure of a single request.
#[derive(Debug)]
pub enum ProviderError {
    /// Update referenced an id with no row.
    NotFound(PersonId),
    /// Delete criteria lacked a usable `id`.
    MalformedSelector(String),
    /// Insert/update values were incomplete or carried forbidden fields.
    InvalidValues(String),
    /// Store failure raised in this process.
    Store(StoreError),
    /// Store failure reported by a provider on the far side of a transport.
    Internal(String),
}

impl ProviderError {
    /// Stable error kind used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::MalformedSelector(_) => "malformed_selector",
            Self::InvalidValues(_) => "invalid_values",
            Self::Store(_) | Self::Internal(_) => "internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::MalformedSelector(message) => write!(f, "malformed delete selector: {message}"),
            Self::InvalidValues(message) => write!(f, "invalid person values: {message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "provider failure: {message}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ProviderError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Loosely typed column values, checked per operation by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
}

impl RecordValues {
    /// Values for inserting `person`.
    pub fn for_insert(person: &NewPerson) -> Self {
        Self {
            id: None,
            name: Some(person.name.clone()),
            age: Some(person.age),
        }
    }

    /// Values replacing every field of `person`.
    pub fn for_update(person: &Person) -> Self {
        Self {
            id: Some(person.id),
            name: Some(person.name.clone()),
            age: Some(person.age),
        }
    }

    /// Checks insert values: `name` and `age` required, `id` forbidden.
    pub fn into_new_person(self) -> ProviderResult<NewPerson> {
        if let Some(id) = self.id {
            return Err(ProviderError::InvalidValues(format!(
                "id {id} must not be supplied on insert"
            )));
        }
        let name = self
            .name
            .ok_or_else(|| ProviderError::InvalidValues("name is required".to_string()))?;
        let age = self
            .age
            .ok_or_else(|| ProviderError::InvalidValues("age is required".to_string()))?;
        Ok(NewPerson { name, age })
    }

    /// Checks update values: `id` required, other fields optional.
    pub fn into_patch(self) -> ProviderResult<(PersonId, PersonPatch)> {
        let id = self
            .id
            .ok_or_else(|| ProviderError::InvalidValues("id is required".to_string()))?;
        Ok((
            id,
            PersonPatch {
                name: self.name,
                age: self.age,
            },
        ))
    }
}

/// One externally addressed provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProviderRequest {
    Query {
        path: String,
    },
    Insert {
        path: String,
        values: RecordValues,
    },
    Update {
        path: String,
        values: RecordValues,
    },
    Delete {
        path: String,
        selector: DeleteSelector,
    },
}

impl ProviderRequest {
    pub fn path(&self) -> &str {
        match self {
            Self::Query { path }
            | Self::Insert { path, .. }
            | Self::Update { path, .. }
            | Self::Delete { path, .. } => path,
        }
    }

    /// Short operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Result of a routed provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderResponse {
    /// Query result; empty when the path matched nothing.
    Rows { rows: Vec<Person> },
    /// Insert result; both fields `None` when unrouted or skipped.
    Inserted {
        id: Option<PersonId>,
        path: Option<String>,
    },
    /// Update/delete result.
    Affected { count: usize },
}
