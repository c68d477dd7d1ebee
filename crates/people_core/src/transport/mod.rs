//! Request/response seam between observation clients and the provider.
//!
//! # Responsibility
//! - Define the `ProviderTransport` contract: blocking calls plus observer
//!   registration.
//! - Provide an in-process transport and a JSON loopback transport.
//!
//! # Invariants
//! - `call` returns only after the provider finished the request.
//! - Transport failures (`TransportError`) are never confused with provider
//!   failures, which travel inside the `Ok` value.
//! - A disconnected transport rejects every call, including observer
//!   registration.

mod json;

pub use json::JsonTransport;

use crate::notify::{ChangeSubscription, ObserverId, ResourceScope};
use crate::provider::request::{ProviderRequest, ProviderResponse, ProviderResult};
use crate::provider::PersonProvider;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type TransportResult<T> = Result<T, TransportError>;

/// Failure to reach or talk to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Provider side is unreachable.
    Disconnected,
    /// Message could not be encoded or decoded.
    Codec(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "provider transport is disconnected"),
            Self::Codec(message) => write!(f, "provider message codec failure: {message}"),
        }
    }
}

impl Error for TransportError {}

/// Carries provider requests and observer registrations.
pub trait ProviderTransport: Send + Sync {
    /// Performs one blocking provider call.
    fn call(&self, request: ProviderRequest) -> TransportResult<ProviderResult<ProviderResponse>>;

    /// Registers a change observer on `scope`.
    fn register_observer(
        &self,
        scope: &ResourceScope,
        descendants: bool,
    ) -> TransportResult<ChangeSubscription>;

    /// Removes an observer. Returns `false` when it was already gone.
    fn unregister_observer(&self, id: ObserverId) -> TransportResult<bool>;
}

/// Connectivity switch shared by the bundled transports.
#[derive(Debug)]
struct Link {
    connected: AtomicBool,
}

impl Link {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }

    fn ensure_connected(&self) -> TransportResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

/// Direct in-process transport.
pub struct LocalTransport {
    provider: Arc<PersonProvider>,
    link: Link,
}

impl LocalTransport {
    pub fn new(provider: Arc<PersonProvider>) -> Self {
        Self {
            provider,
            link: Link::new(),
        }
    }

    /// Makes every later call fail with `TransportError::Disconnected`.
    pub fn disconnect(&self) {
        self.link.set_connected(false);
    }

    pub fn reconnect(&self) {
        self.link.set_connected(true);
    }
}

impl ProviderTransport for LocalTransport {
    fn call(&self, request: ProviderRequest) -> TransportResult<ProviderResult<ProviderResponse>> {
        self.link.ensure_connected()?;
        Ok(self.provider.handle(request))
    }

    fn register_observer(
        &self,
        scope: &ResourceScope,
        descendants: bool,
    ) -> TransportResult<ChangeSubscription> {
        self.link.ensure_connected()?;
        Ok(self.provider.subscribe(scope, descendants))
    }

    fn unregister_observer(&self, id: ObserverId) -> TransportResult<bool> {
        // Removal stays possible while disconnected so cleanup never leaks.
        Ok(self.provider.unsubscribe(id))
    }
}
