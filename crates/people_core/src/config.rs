//! Service configuration.
//!
//! Every field has a default; `from_env` overrides from `PEOPLE_*` variables.

use crate::logging::default_log_level;
use crate::provider::DEFAULT_AUTHORITY;
use std::env;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "PEOPLE_DB_PATH";
pub const AUTHORITY_ENV: &str = "PEOPLE_AUTHORITY";
pub const LOG_LEVEL_ENV: &str = "PEOPLE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PEOPLE_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleConfig {
    /// SQLite file; `None` keeps the table in memory.
    pub db_path: Option<PathBuf>,
    /// Authority accepted in `content://` resource paths.
    pub authority: String,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for PeopleConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            authority: DEFAULT_AUTHORITY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl PeopleConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV).map(PathBuf::from),
            authority: read(AUTHORITY_ENV).unwrap_or(defaults.authority),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
