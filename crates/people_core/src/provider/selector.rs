//! Field-based delete criteria passed across the provider boundary.

use crate::model::person::PersonId;
use crate::provider::request::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ID_KEY: &str = "id";
pub const NAME_KEY: &str = "name";
pub const AGE_KEY: &str = "age";

/// Flat string-keyed delete criteria.
///
/// `id` is mandatory for every delete; other keys travel along but do not
/// narrow the deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteSelector {
    fields: BTreeMap<String, String>,
}

impl DeleteSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector addressing one row.
    pub fn by_id(id: PersonId) -> Self {
        Self::new().with(ID_KEY, id.to_string())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Parses the legacy `key=?&key=?` selection with positional arguments.
    ///
    /// Each `?` takes the next argument in order; extra arguments are
    /// ignored. Pairs are split on `&`, key and value are the first and last
    /// `=`-separated parts.
    ///
    /// # Errors
    /// - `MalformedSelector` when placeholders outnumber arguments.
    pub fn from_legacy(expression: &str, args: &[String]) -> ProviderResult<Self> {
        let mut substituted = String::with_capacity(expression.len());
        let mut remaining = args.iter();
        for ch in expression.chars() {
            if ch != '?' {
                substituted.push(ch);
                continue;
            }
            let value = remaining.next().ok_or_else(|| {
                ProviderError::MalformedSelector(format!(
                    "selection `{expression}` has more placeholders than the {} argument(s)",
                    args.len()
                ))
            })?;
            substituted.push_str(value);
        }

        let fields = substituted
            .split('&')
            .map(|pair| {
                let key = pair.split('=').next().unwrap_or_default();
                let value = pair.rsplit('=').next().unwrap_or_default();
                (key.to_string(), value.to_string())
            })
            .collect();
        Ok(Self { fields })
    }

    /// Returns the mandatory row id.
    ///
    /// # Errors
    /// - `MalformedSelector` when `id` is missing or not an integer.
    pub fn id(&self) -> ProviderResult<PersonId> {
        let raw = self.get(ID_KEY).ok_or_else(|| {
            ProviderError::MalformedSelector("id is required".to_string())
        })?;
        raw.trim().parse::<PersonId>().map_err(|_| {
            ProviderError::MalformedSelector(format!("id `{raw}` is not an integer"))
        })
    }
}
