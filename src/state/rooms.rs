//! Connection registry and per-match subscriber rooms for the realtime
//! gateway.

use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Handle used to push messages to a connected scoreboard client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Connection identifier assigned at upgrade time.
    pub id: Uuid,
    /// Sender feeding the connection's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Tracks live connections and which match room each one has joined.
#[derive(Default)]
pub struct RoomRegistry {
    connections: DashMap<Uuid, ClientConnection>,
    rooms: DashMap<String, HashSet<Uuid>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly upgraded connection.
    pub fn register(&self, connection: ClientConnection) {
        self.connections.insert(connection.id, connection);
    }

    /// Forget a connection and drop it from every room it joined.
    pub fn unregister(&self, connection_id: Uuid) {
        self.connections.remove(&connection_id);
        self.rooms.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
    }

    /// Subscribe a connection to a match room.
    pub fn join(&self, match_id: &str, connection_id: Uuid) {
        self.rooms
            .entry(match_id.to_string())
            .or_default()
            .insert(connection_id);
    }

    /// Number of live connections, used by the health endpoint.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send a message to a single connection, if it is still tracked.
    pub fn send_to(&self, connection_id: Uuid, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        if let Some(connection) = self.connections.get(&connection_id) {
            let _ = connection.tx.send(frame);
        }
    }

    /// Fan a message out to every member of a match room.
    pub fn broadcast_room(&self, match_id: &str, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let Some(members) = self.rooms.get(match_id) else {
            return;
        };
        for connection_id in members.iter() {
            if let Some(connection) = self.connections.get(connection_id) {
                let _ = connection.tx.send(frame.clone());
            }
        }
    }

    /// Fan a message out to every live connection regardless of room.
    pub fn broadcast_all(&self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        for connection in self.connections.iter() {
            let _ = connection.tx.send(frame.clone());
        }
    }
}

/// Serialize a server message into a text frame. Serialization failure is a
/// bug in our own types; log it and drop the message rather than erroring
/// the connection.
fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            None
        }
    }
}
