//! Backend-agnostic storage abstraction for match records.

use std::error::Error;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::dao::models::{MatchRecord, MatchSaveRequest};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached or rejected the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the durable record store for matches.
///
/// Persistence is a convenience layer: every caller treats failures as soft
/// and the realtime path never blocks on them.
pub trait MatchStore: Send + Sync {
    /// Fetch one match record by id, `None` when the record does not exist.
    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchRecord>>>;
    /// Push the durable subset of a match back to the store.
    fn save_match(
        &self,
        id: String,
        update: MatchSaveRequest,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Open a stream of externally-originated record updates.
    fn changes(&self) -> BoxFuture<'static, StorageResult<BoxStream<'static, MatchRecord>>>;
    /// Verify the store is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
