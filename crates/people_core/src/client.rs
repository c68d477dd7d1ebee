//! Consumer-side person resolver.
//!
//! # Responsibility
//! - Perform one-shot provider calls through a `ProviderTransport`.
//! - Expose the table as a stream that re-fetches on every change signal.
//!
//! # Invariants
//! - Mutations have no local side effect; refreshed lists arrive through the
//!   `list()` stream.
//! - A `list()` stream owns its observer registration and removes it when
//!   dropped, whether it finished, failed or was cancelled.
//! - Transport failures surface as `ClientError::Transport`, never as a
//!   provider `NotFound`.

use crate::model::person::{NewPerson, Person, PersonId, PersonPatch};
use crate::notify::{ChangeSubscription, ResourceScope};
use crate::provider::request::{ProviderError, ProviderRequest, ProviderResponse, RecordValues};
use crate::provider::route::{name_path, table_path};
use crate::provider::selector::{DeleteSelector, AGE_KEY, NAME_KEY};
use crate::provider::PersonProvider;
use crate::store::PersonListStream;
use crate::transport::{ProviderTransport, TransportError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failure of one resolver call.
#[derive(Debug)]
pub enum ClientError {
    /// The provider could not be reached.
    Transport(TransportError),
    /// The provider rejected the request.
    Provider(ProviderError),
    /// The provider answered with a response of the wrong kind.
    UnexpectedResponse(&'static str),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "{err}"),
            Self::UnexpectedResponse(expected) => {
                write!(f, "unexpected provider response, expected {expected}")
            }
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::UnexpectedResponse(_) => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<ProviderError> for ClientError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

/// Person resolver bound to one transport.
pub struct PersonResolver<T> {
    transport: Arc<T>,
}

impl<T> Clone for PersonResolver<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: ProviderTransport + 'static> PersonResolver<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Streams the full table: once on start, then after every change.
    ///
    /// The observer is registered before the first fetch, so a change racing
    /// the first fetch costs one extra refresh rather than a lost update.
    /// Signals already queued when a refresh starts are folded into it.
    /// The stream ends after yielding its first error.
    pub fn list(&self) -> PersonListStream<ClientError> {
        let transport = Arc::clone(&self.transport);

        Box::pin(async_stream::stream! {
            let scope = PersonProvider::table_scope();
            let mut guard = match ObserverGuard::register(Arc::clone(&transport), &scope) {
                Ok(guard) => guard,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let initial = fetch_all(transport.as_ref());
            let failed = initial.is_err();
            yield initial;
            if failed {
                return;
            }

            while guard.subscription.changed().await.is_some() {
                let mut coalesced = 0usize;
                while guard.subscription.try_changed().is_some() {
                    coalesced += 1;
                }
                debug!("event=resolver_refresh module=client status=start coalesced={coalesced}");
                let people = fetch_all(transport.as_ref());
                let failed = people.is_err();
                yield people;
                if failed {
                    return;
                }
            }
        })
    }

    /// One-shot fetch of the full table.
    pub fn fetch_all(&self) -> ClientResult<Vec<Person>> {
        fetch_all(self.transport.as_ref())
    }

    /// One-shot fetch of the people named `name`.
    pub fn fetch_by_name(&self, name: &str) -> ClientResult<Vec<Person>> {
        expect_rows(self.transport.call(ProviderRequest::Query {
            path: name_path(name),
        })?)
    }

    /// Inserts one person. Returns the assigned id when the row was stored.
    pub fn insert(&self, person: &NewPerson) -> ClientResult<Option<PersonId>> {
        let response = self.transport.call(ProviderRequest::Insert {
            path: table_path(),
            values: RecordValues::for_insert(person),
        })??;
        match response {
            ProviderResponse::Inserted { id, .. } => Ok(id),
            _ => Err(ClientError::UnexpectedResponse("inserted")),
        }
    }

    /// Replaces every field of the stored row `person.id`.
    pub fn update(&self, person: &Person) -> ClientResult<usize> {
        self.send_update(RecordValues::for_update(person))
    }

    /// Replaces only the fields present in `patch`.
    pub fn update_fields(&self, id: PersonId, patch: &PersonPatch) -> ClientResult<usize> {
        self.send_update(RecordValues {
            id: Some(id),
            name: patch.name.clone(),
            age: patch.age,
        })
    }

    /// Deletes the stored row `person.id`.
    pub fn delete(&self, person: &Person) -> ClientResult<usize> {
        self.send_delete(
            DeleteSelector::by_id(person.id)
                .with(NAME_KEY, person.name.clone())
                .with(AGE_KEY, person.age.to_string()),
        )
    }

    /// Deletes the row `id` without fetching it first.
    pub fn delete_by_id(&self, id: PersonId) -> ClientResult<usize> {
        self.send_delete(DeleteSelector::by_id(id))
    }

    fn send_delete(&self, selector: DeleteSelector) -> ClientResult<usize> {
        expect_count(self.transport.call(ProviderRequest::Delete {
            path: table_path(),
            selector,
        })?)
    }

    fn send_update(&self, values: RecordValues) -> ClientResult<usize> {
        expect_count(self.transport.call(ProviderRequest::Update {
            path: table_path(),
            values,
        })?)
    }
}

/// Observer registration that unregisters through the transport on drop.
struct ObserverGuard<T: ProviderTransport> {
    transport: Arc<T>,
    subscription: ChangeSubscription,
}

impl<T: ProviderTransport> ObserverGuard<T> {
    fn register(transport: Arc<T>, scope: &ResourceScope) -> ClientResult<Self> {
        let subscription = transport.register_observer(scope, true)?;
        Ok(Self {
            transport,
            subscription,
        })
    }
}

impl<T: ProviderTransport> Drop for ObserverGuard<T> {
    fn drop(&mut self) {
        let id = self.subscription.id();
        if let Err(err) = self.transport.unregister_observer(id) {
            warn!("event=resolver_unregister module=client status=error id={id} error={err}");
        }
    }
}

fn fetch_all<T: ProviderTransport + ?Sized>(transport: &T) -> ClientResult<Vec<Person>> {
    expect_rows(transport.call(ProviderRequest::Query { path: table_path() })?)
}

fn expect_rows(
    response: Result<ProviderResponse, ProviderError>,
) -> ClientResult<Vec<Person>> {
    match response? {
        ProviderResponse::Rows { rows } => Ok(rows),
        _ => Err(ClientError::UnexpectedResponse("rows")),
    }
}

fn expect_count(
    response: Result<ProviderResponse, ProviderError>,
) -> ClientResult<usize> {
    match response? {
        ProviderResponse::Affected { count } => Ok(count),
        _ => Err(ClientError::UnexpectedResponse("affected count")),
    }
}
