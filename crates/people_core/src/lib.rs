//! Core of the people service.
//!
//! A single-table person store with change observation, a provider facade
//! that routes addressed requests onto it, and a resolver client that keeps
//! a re-fetched list in sync across a transport.

pub mod client;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod provider;
pub mod repo;
pub mod runtime;
pub mod store;
pub mod transport;
pub mod wire;

pub use client::{ClientError, ClientResult, PersonResolver};
pub use config::PeopleConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{NewPerson, Person, PersonId, PersonPatch};
pub use notify::{ChangeNotifier, ChangeSignal, ChangeSubscription, ObserverId, ResourceScope};
pub use provider::request::{
    ProviderError, ProviderRequest, ProviderResponse, ProviderResult, RecordValues,
};
pub use provider::selector::DeleteSelector;
pub use provider::{PersonProvider, DEFAULT_AUTHORITY};
pub use repo::person_repo::{PersonRepository, SqlitePersonRepository, StoreError, StoreResult};
pub use runtime::PeopleRuntime;
pub use store::{PersonListStream, PersonStore};
pub use transport::{
    JsonTransport, LocalTransport, ProviderTransport, TransportError, TransportResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
