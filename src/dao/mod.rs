//! Persistence layer: record shapes, the storage abstraction, and the
//! PocketBase implementation.

/// Persisted record shapes shared across storage backends.
pub mod models;
/// PocketBase-backed match store and realtime subscription.
pub mod pocketbase;
/// Storage abstraction layer.
pub mod storage;
