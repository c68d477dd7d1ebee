//! Loopback transport that marshals every call through the JSON wire format.

use super::{Link, ProviderTransport, TransportResult};
use crate::notify::{ChangeSubscription, ObserverId, ResourceScope};
use crate::provider::request::{ProviderRequest, ProviderResponse, ProviderResult};
use crate::provider::PersonProvider;
use crate::wire;
use log::trace;
use std::sync::Arc;

/// Transport exercising the same encode/serve/decode path a process
/// boundary would.
pub struct JsonTransport {
    provider: Arc<PersonProvider>,
    link: Link,
}

impl JsonTransport {
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

impl ProviderTransport for JsonTransport {
    fn call(&self, request: ProviderRequest) -> TransportResult<ProviderResult<ProviderResponse>> {
        self.link.ensure_connected()?;
        let encoded = wire::encode_request(&request)?;
        trace!("event=wire_call module=transport status=start bytes={}", encoded.len());
        let response = wire::serve(&self.provider, &encoded);
        wire::decode_response(&response)
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
        Ok(self.provider.unsubscribe(id))
    }
}
