//! Persisted record shapes and their mapping onto in-memory match state.

use serde::{Deserialize, Serialize};

use crate::state::match_state::{Match, MatchConfig, MatchPatch, ScorePair, SetRecord, Team, now_ms};

/// Shape of a match record as stored in the `volleyball_matches` collection.
///
/// Ephemeral fields (winner, serving team, undo history, timeout clock) are
/// never persisted; hydration reconstructs them with fresh defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Record id, shared with the in-memory match and the realtime room.
    pub id: String,
    /// Display name of the match.
    #[serde(default)]
    pub name: String,
    /// Home team label.
    #[serde(default)]
    pub home_team: String,
    /// Away team label.
    #[serde(default)]
    pub away_team: String,
    /// Opaque reference to the home team logo.
    #[serde(default)]
    pub home_logo: Option<String>,
    /// Opaque reference to the away team logo.
    #[serde(default)]
    pub away_logo: Option<String>,
    /// Opaque reference to a background image.
    #[serde(default)]
    pub background_image: Option<String>,
    /// Optional PIN gating write access from the control UI.
    #[serde(default)]
    pub pin: Option<String>,
    /// Ruleset and cosmetics.
    #[serde(default)]
    pub config: MatchConfig,
    /// Completed sets in chronological order.
    #[serde(default)]
    pub sets: Vec<SetRecord>,
    /// 1-based index of the set in progress.
    #[serde(default = "default_current_set")]
    pub current_set: u32,
    /// Live tally of the set in progress.
    #[serde(default)]
    pub scores: ScorePair,
    /// Whether the record is flagged live by the management surface.
    /// Stored snake_case in the collection, unlike the other fields.
    #[serde(default, rename = "is_live")]
    pub is_live: bool,
}

fn default_current_set() -> u32 {
    1
}

impl MatchRecord {
    /// Reconstruct in-memory match state from a persisted record.
    ///
    /// This is deliberately not a literal deserialize: all realtime-only
    /// fields start from their defaults regardless of what storage held.
    pub fn into_match(self) -> Match {
        let now = now_ms();
        Match {
            id: self.id,
            name: self.name,
            home_team: self.home_team,
            away_team: self.away_team,
            home_logo: self.home_logo,
            away_logo: self.away_logo,
            background_image: self.background_image,
            pin: self.pin,
            config: self.config,
            sets: self.sets,
            current_set: self.current_set,
            scores: self.scores,
            serving_team: None,
            left_side_team: Team::Home,
            winner: None,
            timeout: Default::default(),
            show_final_result: false,
            is_live: self.is_live,
            last_active: now,
            created_at: now,
            history: Default::default(),
        }
    }

    /// Details patch folding an externally-edited record into a resident
    /// match. Score and set state stay untouched: memory is authoritative
    /// for the live tally.
    pub fn into_patch(self) -> MatchPatch {
        MatchPatch {
            name: Some(self.name),
            home_team: Some(self.home_team),
            away_team: Some(self.away_team),
            home_logo: self.home_logo,
            away_logo: self.away_logo,
            background_image: self.background_image,
            pin: self.pin,
            config: Some(self.config),
            left_side_team: None,
            is_live: Some(self.is_live),
        }
    }
}

/// Durable subset of a match pushed back to the store after mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchSaveRequest {
    /// Completed sets in chronological order.
    pub sets: Vec<SetRecord>,
    /// 1-based index of the set in progress.
    pub current_set: u32,
    /// Live tally of the set in progress.
    pub scores: ScorePair,
}

impl From<&Match> for MatchSaveRequest {
    fn from(m: &Match) -> Self {
        Self {
            sets: m.sets.clone(),
            current_set: m.current_set,
            scores: m.scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MatchRecord {
        serde_json::from_str(
            r#"{
                "id": "rec123",
                "name": "Finals",
                "homeTeam": "Eagles",
                "awayTeam": "Sharks",
                "config": {"bestOf": 5, "setPoints": 25, "tieBreakPoints": 15},
                "sets": [{"setNumber": 1, "home": 25, "away": 20, "winner": "home"}],
                "currentSet": 2,
                "scores": {"home": 3, "away": 7},
                "is_live": true
            }"#,
        )
        .expect("record parses")
    }

    #[test]
    fn hydration_resets_ephemeral_fields() {
        let m = record().into_match();

        assert_eq!(m.id, "rec123");
        assert_eq!(m.current_set, 2);
        assert_eq!(m.scores, ScorePair { home: 3, away: 7 });
        assert_eq!(m.sets.len(), 1);
        assert_eq!(m.config.best_of, 5);

        assert_eq!(m.winner, None);
        assert_eq!(m.serving_team, None);
        assert!(m.history.is_empty());
        assert!(!m.timeout.active);
    }

    #[test]
    fn missing_optional_record_fields_default() {
        let record: MatchRecord =
            serde_json::from_str(r#"{"id": "rec456"}"#).expect("sparse record parses");
        let m = record.into_match();

        assert_eq!(m.current_set, 1);
        assert_eq!(m.scores, ScorePair::default());
        assert_eq!(m.config.best_of, 3);
        assert!(!m.is_live);
    }

    #[test]
    fn save_request_extracts_durable_subset() {
        let m = record().into_match();
        let save = MatchSaveRequest::from(&m);

        assert_eq!(save.current_set, 2);
        assert_eq!(save.scores, ScorePair { home: 3, away: 7 });
        assert_eq!(save.sets, m.sets);

        let json = serde_json::to_value(&save).expect("serializes");
        assert_eq!(json["currentSet"], 2);
        assert!(json.get("winner").is_none());
    }
}
