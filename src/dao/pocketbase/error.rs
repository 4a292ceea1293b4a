//! Error types shared by the PocketBase storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`PocketBaseDaoError`] failures.
pub type PocketBaseResult<T> = Result<T, PocketBaseDaoError>;

/// Failures that can occur while interacting with PocketBase.
#[derive(Debug, Error)]
pub enum PocketBaseDaoError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build PocketBase client")]
    ClientBuilder {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send PocketBase request to `{path}`")]
    RequestSend {
        /// Request path relative to the base URL.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// PocketBase returned an unexpected status code.
    #[error("unexpected PocketBase response status {status} for `{path}`")]
    RequestStatus {
        /// Request path relative to the base URL.
        path: String,
        /// Status code received.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode PocketBase response for `{path}`")]
    DecodeResponse {
        /// Request path relative to the base URL.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// A realtime frame carried JSON that does not match the expected shape.
    #[error("failed to deserialize PocketBase realtime payload: {context}")]
    RealtimePayload {
        /// What was being parsed.
        context: &'static str,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// The realtime stream closed before the connect handshake completed.
    #[error("PocketBase realtime stream ended before PB_CONNECT")]
    RealtimeHandshake,
}

impl From<PocketBaseDaoError> for StorageError {
    fn from(err: PocketBaseDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
