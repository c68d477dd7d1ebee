//! Composition root wiring store, notifier and provider.
//!
//! # Invariants
//! - The store is opened exactly once, here, and shared by reference count.
//! - Store, provider and every transport built from this runtime see the
//!   same rows and the same notifier.

use crate::client::PersonResolver;
use crate::config::PeopleConfig;
use crate::logging;
use crate::notify::ChangeNotifier;
use crate::provider::PersonProvider;
use crate::repo::person_repo::{StoreError, StoreResult};
use crate::store::PersonStore;
use crate::transport::{JsonTransport, LocalTransport};
use log::{info, warn};
use std::sync::Arc;

/// Explicitly owned service graph.
pub struct PeopleRuntime {
    store: Arc<PersonStore>,
    provider: Arc<PersonProvider>,
}

impl PeopleRuntime {
    /// Initializes logging when `config.log_dir` is set.
    ///
    /// Returns whether logging is active afterwards.
    pub fn init_logging(config: &PeopleConfig) -> Result<bool, String> {
        match &config.log_dir {
            Some(log_dir) => {
                logging::init_logging(&config.log_level, &log_dir.to_string_lossy())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Opens the store described by `config` and wires the provider.
    pub fn compose(config: &PeopleConfig) -> StoreResult<Self> {
        let store = match &config.db_path {
            Some(path) => PersonStore::open(path),
            None => PersonStore::open_in_memory(),
        }
        .map_err(|err: StoreError| {
            warn!("event=runtime_compose module=runtime status=error error={err}");
            err
        })?;

        let runtime = Self::with_store(Arc::new(store), &config.authority);
        info!(
            "event=runtime_compose module=runtime status=ok mode={}",
            if config.db_path.is_some() { "file" } else { "memory" }
        );
        Ok(runtime)
    }

    /// Wires a provider around an existing store.
    pub fn with_store(store: Arc<PersonStore>, authority: &str) -> Self {
        let provider = Arc::new(PersonProvider::new(
            Arc::clone(&store),
            ChangeNotifier::new(),
            authority,
        ));
        Self { store, provider }
    }

    pub fn store(&self) -> &Arc<PersonStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<PersonProvider> {
        &self.provider
    }

    /// Resolver calling the provider directly.
    pub fn local_resolver(&self) -> PersonResolver<LocalTransport> {
        PersonResolver::new(Arc::new(LocalTransport::new(Arc::clone(&self.provider))))
    }

    /// Resolver marshalling every call through the JSON wire format.
    pub fn json_resolver(&self) -> PersonResolver<JsonTransport> {
        PersonResolver::new(Arc::new(JsonTransport::new(Arc::clone(&self.provider))))
    }
}
