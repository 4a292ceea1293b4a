//! Wire-facing payload types for the REST and WebSocket surfaces.

pub mod health;
pub mod matches;
pub mod ws;
