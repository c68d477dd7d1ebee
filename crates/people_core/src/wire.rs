//! JSON wire format for provider calls.
//!
//! Requests are `ProviderRequest` objects tagged by `op`. Responses are
//! `{"ok": <ProviderResponse>}` or `{"err": {"kind", "message", "id"?}}`.

use crate::model::person::PersonId;
use crate::provider::request::{ProviderError, ProviderRequest, ProviderResponse, ProviderResult};
use crate::provider::PersonProvider;
use crate::transport::TransportError;
use log::warn;
use serde::{Deserialize, Serialize};

const BAD_REQUEST_KIND: &str = "bad_request";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireResponse {
    Ok(ProviderResponse),
    Err(WireError),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireError {
    kind: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<PersonId>,
}

impl From<&ProviderError> for WireError {
    fn from(err: &ProviderError) -> Self {
        let (message, id) = match err {
            ProviderError::NotFound(id) => (err.to_string(), Some(*id)),
            ProviderError::MalformedSelector(message) | ProviderError::InvalidValues(message) => {
                (message.clone(), None)
            }
            ProviderError::Store(_) | ProviderError::Internal(_) => (err.to_string(), None),
        };
        Self {
            kind: err.kind().to_string(),
            message,
            id,
        }
    }
}

impl WireError {
    fn into_provider_error(self) -> Result<ProviderError, TransportError> {
        match self.kind.as_str() {
            "not_found" => self
                .id
                .map(ProviderError::NotFound)
                .ok_or_else(|| TransportError::Codec("not_found error without id".to_string())),
            "malformed_selector" => Ok(ProviderError::MalformedSelector(self.message)),
            "invalid_values" => Ok(ProviderError::InvalidValues(self.message)),
            "internal" => Ok(ProviderError::Internal(self.message)),
            BAD_REQUEST_KIND => Err(TransportError::Codec(self.message)),
            other => Err(TransportError::Codec(format!("unknown error kind `{other}`"))),
        }
    }
}

/// Encodes one request for the wire.
pub fn encode_request(request: &ProviderRequest) -> Result<String, TransportError> {
    serde_json::to_string(request).map_err(|err| TransportError::Codec(err.to_string()))
}

/// Decodes one response received from the wire.
///
/// The outer result is the transport outcome, the inner one the provider's.
pub fn decode_response(json: &str) -> Result<ProviderResult<ProviderResponse>, TransportError> {
    let response: WireResponse =
        serde_json::from_str(json).map_err(|err| TransportError::Codec(err.to_string()))?;
    match response {
        WireResponse::Ok(response) => Ok(Ok(response)),
        WireResponse::Err(err) => Ok(Err(err.into_provider_error()?)),
    }
}

/// Serves one encoded request and returns the encoded response.
///
/// Never fails: undecodable requests produce a `bad_request` error envelope.
pub fn serve(provider: &PersonProvider, request_json: &str) -> String {
    let response = match serde_json::from_str::<ProviderRequest>(request_json) {
        Ok(request) => match provider.handle(request) {
            Ok(response) => WireResponse::Ok(response),
            Err(err) => WireResponse::Err(WireError::from(&err)),
        },
        Err(err) => {
            warn!("event=wire_decode module=wire status=error error={err}");
            WireResponse::Err(WireError {
                kind: BAD_REQUEST_KIND.to_string(),
                message: err.to_string(),
                id: None,
            })
        }
    };

    match serde_json::to_string(&response) {
        Ok(json) => json,
        Err(err) => format!(
            r#"{{"err":{{"kind":"internal","message":{}}}}}"#,
            serde_json::Value::String(format!("response encoding failed: {err}"))
        ),
    }
}
