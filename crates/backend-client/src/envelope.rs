use onesat_primitives::Deposit;
use serde::Deserialize;
use serde_json::Value;
use tracing::*;

use crate::errors::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum EnvelopeStatus {
    Ok,
    Error,
}

/// Response wrapper every backend endpoint uses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Unwraps an envelope, returning the `result` payload.
///
/// A 404 is "not found" rather than an error, whatever the body says. A body
/// that is not an envelope is never reported as [`BackendError::Malformed`],
/// that variant is reserved for records that fail to decode.
pub(crate) fn open_envelope(http_status: u16, body: &str) -> Result<Option<Value>, BackendError> {
    if http_status == 404 {
        return Ok(None);
    }

    let resp: ApiResponse = match serde_json::from_str(body) {
        Ok(resp) => resp,
        Err(e) if (200..300).contains(&http_status) => {
            return Err(BackendError::InvalidEnvelope(e.to_string()))
        }
        Err(_) => return Err(BackendError::Status(http_status)),
    };

    match resp.status {
        EnvelopeStatus::Ok => Ok(resp.result.filter(|v| !v.is_null())),
        EnvelopeStatus::Error => Err(BackendError::Api {
            status: http_status,
            message: resp.error.unwrap_or_else(|| "unknown error".to_string()),
        }),
    }
}

pub(crate) fn decode_deposit(value: Value) -> Result<Deposit, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Malformed(e.to_string()))
}

/// Decodes a list of deposits, dropping entries that do not parse.
pub(crate) fn decode_deposit_list(value: Value) -> Result<Vec<Deposit>, BackendError> {
    let Value::Array(items) = value else {
        return Err(BackendError::Malformed("expected a list of deposits".to_string()));
    };

    let mut deposits = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Deposit>(item) {
            Ok(d) => deposits.push(d),
            Err(e) => warn!(err = %e, "skipping malformed deposit record"),
        }
    }
    Ok(deposits)
}
