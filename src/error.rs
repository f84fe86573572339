//! Client-facing error hierarchy.
//!
//! Everything a caller can see goes through [`ClientError`]. A failed
//! conditional-write comparison is deliberately *not* here: the transport
//! worked and the store answered, so it lives on the success path as
//! [`TestAndSet::ConditionNotMet`](crate::TestAndSet::ConditionNotMet).

use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, TLS, timeout and body-read failures from the HTTP layer
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Response body that is neither a record nor a list of records
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-success status carrying a decodable error payload
    #[error("server error: {0}")]
    Server(ApiError),

    /// Non-success status whose body is not a recognizable error payload
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// Watch cancelled through its stop signal
    #[error("watch stopped by the caller")]
    WatchStopped,

    /// Redirect response without a Location header, cannot find the leader
    #[error("redirect response carried no usable Location header")]
    MissingRedirectLocation,

    /// Conditional write exhausted its redirect budget
    #[error("still redirected after following {0} redirects")]
    TooManyRedirects(usize),
}

impl ClientError {
    /// Builds the error for a non-success response from its status and body.
    ///
    /// The store reports failures as a small JSON payload; bodies that do
    /// not parse as that shape are preserved verbatim so nothing gets
    /// swallowed.
    pub(crate) fn from_status_body(
        status: StatusCode,
        body: &[u8],
    ) -> Self {
        match serde_json::from_slice::<ApiError>(body) {
            Ok(api) => ClientError::Server(api),
            Err(_) => ClientError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

/// Error payload the store answers failed requests with.
///
/// Wire shape: `{"errorCode": 100, "message": "Key Not Found", "cause": "/foo"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error_code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
