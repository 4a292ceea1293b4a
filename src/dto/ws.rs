//! Realtime channel messages exchanged with control and display clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::matches::MatchListResponse;
use crate::state::match_state::{Match, MatchPatch, Team};

/// Messages accepted from scoreboard WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe the connection to a match room, hydrating the match from
    /// storage when it is not resident.
    JoinMatch {
        /// Target match id.
        match_id: String,
    },
    /// Apply a signed delta to one side's score.
    UpdateScore {
        /// Target match id.
        match_id: String,
        /// Side to adjust.
        team: Team,
        /// Signed point delta, typically ±1.
        delta: i32,
    },
    /// Archive the current set and advance or conclude the match.
    StartNewSet {
        /// Target match id.
        match_id: String,
    },
    /// Record which side serves next.
    SetServingTeam {
        /// Target match id.
        match_id: String,
        /// Serving side.
        team: Team,
    },
    /// Patch display details of a match.
    UpdateMatchDetails {
        /// Target match id.
        match_id: String,
        /// Explicit fields to change.
        data: MatchPatch,
    },
    /// Zero everything except identity and configuration.
    ResetMatch {
        /// Target match id.
        match_id: String,
    },
    /// Pop the most recent undo snapshot.
    Undo {
        /// Target match id.
        match_id: String,
    },
    /// Arm the 30 second timeout clock.
    StartTimeout {
        /// Target match id.
        match_id: String,
    },
    /// Stop the timeout clock early.
    StopTimeout {
        /// Target match id.
        match_id: String,
    },
    /// Flip the final-result display flag.
    ToggleFinalResult {
        /// Target match id.
        match_id: String,
    },
    /// Anything this server version does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a raw text frame into a client message.
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Messages pushed to scoreboard WebSocket clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state sent once to each newly connected client.
    InitState(MatchListResponse),
    /// Fresh state of a single match, sent to its room after any mutation.
    MatchUpdate(Match),
    /// Full list, sent to all connections after structural changes.
    MatchesUpdated(MatchListResponse),
    /// The requested match exists neither in memory nor in storage.
    MatchNotFound {
        /// Id the client asked for.
        match_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_and_score_messages() {
        let join = ClientMessage::from_json_str(r#"{"type":"join_match","match_id":"abc"}"#)
            .expect("join parses");
        assert!(matches!(join, ClientMessage::JoinMatch { match_id } if match_id == "abc"));

        let score = ClientMessage::from_json_str(
            r#"{"type":"update_score","match_id":"abc","team":"away","delta":-1}"#,
        )
        .expect("score parses");
        match score {
            ClientMessage::UpdateScore { team, delta, .. } => {
                assert_eq!(team, Team::Away);
                assert_eq!(delta, -1);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_team_identifier_is_rejected() {
        let result = ClientMessage::from_json_str(
            r#"{"type":"set_serving_team","match_id":"abc","team":"referee"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unrecognized_type_maps_to_unknown() {
        let msg = ClientMessage::from_json_str(r#"{"type":"celebrate"}"#).expect("parses");
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn server_messages_use_snake_case_tags() {
        let payload = serde_json::to_value(ServerMessage::MatchNotFound {
            match_id: "abc".into(),
        })
        .expect("serializes");
        assert_eq!(payload["type"], "match_not_found");
        assert_eq!(payload["match_id"], "abc");
    }
}
