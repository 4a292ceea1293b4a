//! Service layer gluing the realtime gateway, registry, and storage.

/// OpenAPI document aggregation.
pub mod documentation;
/// Health status reporting.
pub mod health_service;
/// Match action handlers and broadcast helpers.
pub mod match_service;
/// Folding of external record updates.
pub mod sync_service;
/// Deferred timeout auto-expiry.
pub mod timeout_service;
/// WebSocket connection lifecycle.
pub mod websocket_service;
