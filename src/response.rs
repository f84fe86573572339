//! Store responses and the payload decoder.

use chrono::DateTime;
use chrono::Utc;
use serde::de::Error as _;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;

/// One store result: the outcome of a point operation, or a single change
/// record observed through a watch.
///
/// The server omits empty fields on the wire, so every field carries a
/// default and absence is meaningful; a missing `value` on a change record
/// represents a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Response {
    /// Operation that produced this record ("get", "set", "delete",
    /// "testAndSet", ...).
    pub action: String,

    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Value the key held before this change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_value: Option<String>,

    /// True when this change created the key
    pub new_key: bool,

    /// Absolute expiry timestamp, present when the entry carries a TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,

    /// Remaining time to live in seconds, 0 when the entry never expires
    pub ttl: i64,

    /// Position of this change in the store's history. Watches resume
    /// from `index + 1`.
    pub index: u64,
}

/// Decodes a raw payload into an ordered list of records.
///
/// Point queries answer with a single JSON object while directory and
/// history queries answer with an array of the same objects. A payload
/// that opens an array goes straight to the array shape: the derived
/// record deserializer reads sequences positionally, which would turn an
/// empty array into a default record instead of an empty list. Anything
/// else is tried as a single record with a fallback to the array shape;
/// when neither fits, the array attempt's error is the one reported. No
/// semantic validation happens here, an empty array stays empty.
pub fn decode_response_list(body: &[u8]) -> Result<Vec<Response>> {
    if opens_array(body) {
        return Ok(serde_json::from_slice::<Vec<Response>>(body)?);
    }
    match serde_json::from_slice::<Response>(body) {
        Ok(single) => Ok(vec![single]),
        Err(_) => Ok(serde_json::from_slice::<Vec<Response>>(body)?),
    }
}

/// Decodes a payload known to hold exactly one record. Arrays are
/// rejected whatever their length, empty ones included.
pub(crate) fn decode_response(body: &[u8]) -> Result<Response> {
    if opens_array(body) {
        return Err(serde_json::Error::custom("expected a single record, found an array").into());
    }
    Ok(serde_json::from_slice(body)?)
}

/// True when the first significant byte of `body` starts a JSON array.
fn opens_array(body: &[u8]) -> bool {
    body.iter().find(|byte| !byte.is_ascii_whitespace()) == Some(&b'[')
}
