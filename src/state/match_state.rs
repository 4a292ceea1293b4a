//! Core match state: scoring rules, set lifecycle, timeouts, and bounded undo.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Maximum number of undo snapshots retained per match.
pub const HISTORY_CAPACITY: usize = 5;
/// Nominal duration of a volleyball timeout in milliseconds.
pub const TIMEOUT_DURATION_MS: u64 = 30_000;

/// Current wall-clock time in epoch milliseconds, the unit used on the wire.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// One of the two sides of the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// The home side.
    Home,
    /// The away side.
    Away,
}

/// Live point tally for the set in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScorePair {
    /// Points scored by the home team.
    pub home: u32,
    /// Points scored by the away team.
    pub away: u32,
}

impl ScorePair {
    fn side_mut(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::Home => &mut self.home,
            Team::Away => &mut self.away,
        }
    }

    /// Apply a signed delta to one side, clamping to zero on underflow.
    fn apply(&mut self, team: Team, delta: i32) {
        let side = self.side_mut(team);
        *side = if delta >= 0 {
            side.saturating_add(delta as u32)
        } else {
            side.saturating_sub(delta.unsigned_abs())
        };
    }
}

/// Archived record of a completed (or force-closed) set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetRecord {
    /// 1-based position of the set within the match.
    pub set_number: u32,
    /// Final home tally for the set.
    pub home: u32,
    /// Final away tally for the set.
    pub away: u32,
    /// Winning side, or `None` when a set was force-closed on an exact tie.
    pub winner: Option<Team>,
}

/// Immutable-per-match ruleset plus cosmetic display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchConfig {
    /// Odd number of sets that decides the match.
    pub best_of: u32,
    /// Points required to win a non-deciding set.
    pub set_points: u32,
    /// Points required to win the deciding set.
    pub tie_break_points: u32,
    /// Display color for the home team.
    pub home_color: String,
    /// Display color for the away team.
    pub away_color: String,
    /// Optional court identifier shown by overlays.
    pub court_id: Option<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            best_of: 3,
            set_points: 25,
            tie_break_points: 15,
            home_color: "#1d4ed8".into(),
            away_color: "#b91c1c".into(),
            court_id: None,
        }
    }
}

/// Timeout clock state; at most one timeout is in flight per match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutState {
    /// Whether the timeout is currently running.
    pub active: bool,
    /// Epoch milliseconds at which the timeout started.
    pub start_time: i64,
    /// Nominal duration in milliseconds.
    pub duration: u64,
}

impl Default for TimeoutState {
    fn default() -> Self {
        Self {
            active: false,
            start_time: 0,
            duration: TIMEOUT_DURATION_MS,
        }
    }
}

/// Value-type snapshot of the undoable portion of a match, captured before
/// each mutating action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    scores: ScorePair,
    sets: Vec<SetRecord>,
    current_set: u32,
    serving_team: Option<Team>,
    winner: Option<Team>,
}

/// Explicit, named patch applied by `update_match_details` and by
/// externally-originated record updates. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchPatch {
    /// New display name.
    pub name: Option<String>,
    /// New home team label.
    pub home_team: Option<String>,
    /// New away team label.
    pub away_team: Option<String>,
    /// New home logo reference.
    pub home_logo: Option<String>,
    /// New away logo reference.
    pub away_logo: Option<String>,
    /// New background image reference.
    pub background_image: Option<String>,
    /// New control-surface PIN.
    pub pin: Option<String>,
    /// Replacement ruleset/cosmetics.
    pub config: Option<MatchConfig>,
    /// Which side is rendered on the left of the display.
    pub left_side_team: Option<Team>,
    /// Whether the persisted record is flagged live.
    pub is_live: Option<bool>,
}

/// Authoritative in-memory state of a single match.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Stable identifier, also the room key and persistent-record key.
    pub id: String,
    /// Display name of the match.
    pub name: String,
    /// Home team label.
    pub home_team: String,
    /// Away team label.
    pub away_team: String,
    /// Opaque reference to the home team logo.
    pub home_logo: Option<String>,
    /// Opaque reference to the away team logo.
    pub away_logo: Option<String>,
    /// Opaque reference to a background image.
    pub background_image: Option<String>,
    /// Optional PIN gating write access from the control UI.
    pub pin: Option<String>,
    /// Ruleset and cosmetics fixed at creation (replaceable via patch).
    pub config: MatchConfig,
    /// Completed sets in chronological order.
    pub sets: Vec<SetRecord>,
    /// 1-based index of the set in progress.
    pub current_set: u32,
    /// Live tally of the set in progress.
    pub scores: ScorePair,
    /// Side currently serving, advisory only.
    pub serving_team: Option<Team>,
    /// Side rendered on the left of the display, advisory only.
    pub left_side_team: Team,
    /// Match winner; once set, score and set mutation is rejected.
    pub winner: Option<Team>,
    /// Timeout clock state.
    pub timeout: TimeoutState,
    /// Whether overlays should show the final-result view.
    pub show_final_result: bool,
    /// Live flag mirrored from the persistent record.
    pub is_live: bool,
    /// Epoch milliseconds of the last mutation, drives eviction.
    pub last_active: i64,
    /// Epoch milliseconds of creation (or hydration), used for stable listing.
    pub created_at: i64,
    /// Bounded undo buffer, never serialized or persisted.
    #[serde(skip)]
    pub history: VecDeque<Snapshot>,
}

impl Match {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            scores: self.scores,
            sets: self.sets.clone(),
            current_set: self.current_set,
            serving_team: self.serving_team,
            winner: self.winner,
        }
    }

    /// Capture the current undoable state, dropping the oldest entry once
    /// the buffer holds [`HISTORY_CAPACITY`] snapshots.
    fn push_snapshot(&mut self) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(self.snapshot());
    }

    fn touch(&mut self) {
        self.last_active = now_ms();
    }

    /// Apply a signed score delta to one side.
    ///
    /// Rejected without any state change once the match has a winner.
    /// Negative results clamp to zero.
    pub fn update_score(&mut self, team: Team, delta: i32) {
        if self.winner.is_some() {
            return;
        }
        self.push_snapshot();
        self.scores.apply(team, delta);
        self.touch();
    }

    /// Points required to win the set currently in progress.
    fn points_to_win(&self) -> u32 {
        if self.current_set == self.config.best_of {
            self.config.tie_break_points
        } else {
            self.config.set_points
        }
    }

    /// Archive the current set and either advance to the next one or conclude
    /// the match.
    ///
    /// The set winner is the side that reached the target score with a lead of
    /// at least two; when neither side qualifies (a manually forced close),
    /// whoever leads takes the set, and an exact tie records no winner.
    pub fn start_new_set(&mut self) {
        if self.winner.is_some() {
            return;
        }
        self.push_snapshot();

        let ScorePair { home, away } = self.scores;
        let target = self.points_to_win();

        let set_winner = if home >= target && home >= away + 2 {
            Some(Team::Home)
        } else if away >= target && away >= home + 2 {
            Some(Team::Away)
        } else if home > away {
            Some(Team::Home)
        } else if away > home {
            Some(Team::Away)
        } else {
            None
        };

        self.sets.push(SetRecord {
            set_number: self.current_set,
            home,
            away,
            winner: set_winner,
        });

        let sets_to_win = self.config.best_of.div_ceil(2);
        let won_by = |team| {
            self.sets.iter().filter(|s| s.winner == Some(team)).count() as u32
        };

        if won_by(Team::Home) >= sets_to_win {
            self.winner = Some(Team::Home);
        } else if won_by(Team::Away) >= sets_to_win {
            self.winner = Some(Team::Away);
        } else {
            self.current_set += 1;
            self.scores = ScorePair::default();
            self.serving_team = None;
        }

        self.touch();
    }

    /// Record which side serves next.
    pub fn set_serving_team(&mut self, team: Team) {
        self.push_snapshot();
        self.serving_team = Some(team);
        self.touch();
    }

    /// Merge an explicit details patch into the match.
    pub fn apply_patch(&mut self, patch: MatchPatch) {
        self.push_snapshot();

        let MatchPatch {
            name,
            home_team,
            away_team,
            home_logo,
            away_logo,
            background_image,
            pin,
            config,
            left_side_team,
            is_live,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(home_team) = home_team {
            self.home_team = home_team;
        }
        if let Some(away_team) = away_team {
            self.away_team = away_team;
        }
        if let Some(home_logo) = home_logo {
            self.home_logo = Some(home_logo);
        }
        if let Some(away_logo) = away_logo {
            self.away_logo = Some(away_logo);
        }
        if let Some(background_image) = background_image {
            self.background_image = Some(background_image);
        }
        if let Some(pin) = pin {
            self.pin = Some(pin);
        }
        if let Some(config) = config {
            self.config = config;
        }
        if let Some(left_side_team) = left_side_team {
            self.left_side_team = left_side_team;
        }
        if let Some(is_live) = is_live {
            self.is_live = is_live;
        }

        self.touch();
    }

    /// Zero everything except identity and configuration.
    pub fn reset(&mut self) {
        self.push_snapshot();
        self.scores = ScorePair::default();
        self.sets.clear();
        self.current_set = 1;
        self.serving_team = None;
        self.winner = None;
        self.touch();
    }

    /// Restore the most recent snapshot, if any.
    ///
    /// Undo itself does not push a snapshot, so it cannot be undone beyond
    /// the buffer depth.
    pub fn undo(&mut self) {
        let Some(snapshot) = self.history.pop_back() else {
            return;
        };
        self.scores = snapshot.scores;
        self.sets = snapshot.sets;
        self.current_set = snapshot.current_set;
        self.serving_team = snapshot.serving_team;
        self.winner = snapshot.winner;
        self.touch();
    }

    /// Arm the timeout clock. Timeouts are not subject to undo.
    pub fn start_timeout(&mut self) {
        self.timeout = TimeoutState {
            active: true,
            start_time: now_ms(),
            duration: TIMEOUT_DURATION_MS,
        };
        self.touch();
    }

    /// Stop the timeout clock, keeping start time and duration as a record.
    pub fn stop_timeout(&mut self) {
        self.timeout.active = false;
        self.touch();
    }

    /// Flip the final-result display flag. Display-only, not undoable.
    pub fn toggle_final_result(&mut self) {
        self.show_final_result = !self.show_final_result;
        self.touch();
    }

    /// Whether the deferred auto-expiry may stop the timeout: it must still
    /// be running and the nominal duration must actually have elapsed, which
    /// guards against a stop/restart cycle inside the deferred window.
    pub fn timeout_elapsed(&self, now: i64) -> bool {
        self.timeout.active && now - self.timeout.start_time >= self.timeout.duration as i64
    }

    /// Whether the match has been inactive longer than `retention_ms`.
    pub fn is_stale(&self, now: i64, retention_ms: i64) -> bool {
        now - self.last_active >= retention_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_match() -> Match {
        Match {
            id: "m1".into(),
            name: "Test Match".into(),
            home_team: "Home".into(),
            away_team: "Away".into(),
            home_logo: None,
            away_logo: None,
            background_image: None,
            pin: None,
            config: MatchConfig::default(),
            sets: Vec::new(),
            current_set: 1,
            scores: ScorePair::default(),
            serving_team: None,
            left_side_team: Team::Home,
            winner: None,
            timeout: TimeoutState::default(),
            show_final_result: false,
            is_live: false,
            last_active: now_ms(),
            created_at: now_ms(),
            history: VecDeque::new(),
        }
    }

    fn score_n(m: &mut Match, team: Team, n: u32) {
        for _ in 0..n {
            m.update_score(team, 1);
        }
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let mut m = test_match();
        m.update_score(Team::Home, -1);
        assert_eq!(m.scores, ScorePair { home: 0, away: 0 });

        m.update_score(Team::Home, 1);
        m.update_score(Team::Home, -3);
        assert_eq!(m.scores.home, 0);
    }

    #[test]
    fn finished_match_rejects_score_updates() {
        let mut m = test_match();
        m.winner = Some(Team::Away);
        let history_len = m.history.len();

        m.update_score(Team::Home, 1);

        assert_eq!(m.scores.home, 0);
        assert_eq!(m.history.len(), history_len, "no snapshot on rejection");
    }

    #[test]
    fn regular_set_completion_advances_match() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 25);
        score_n(&mut m, Team::Away, 23);

        m.start_new_set();

        assert_eq!(
            m.sets,
            vec![SetRecord {
                set_number: 1,
                home: 25,
                away: 23,
                winner: Some(Team::Home),
            }]
        );
        assert_eq!(m.current_set, 2);
        assert_eq!(m.scores, ScorePair::default());
        assert_eq!(m.serving_team, None);
        assert_eq!(m.winner, None, "one set won out of two required");
    }

    #[test]
    fn set_needs_two_point_lead_at_target() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 25);
        score_n(&mut m, Team::Away, 24);

        m.start_new_set();

        // 25-24 misses the strict condition; fallback awards the leader.
        assert_eq!(m.sets[0].winner, Some(Team::Home));
    }

    #[test]
    fn deuce_set_goes_to_the_side_that_breaks_away() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 25);
        score_n(&mut m, Team::Away, 27);

        m.start_new_set();

        // Both sides passed the target; only away holds the two-point lead.
        assert_eq!(
            m.sets,
            vec![SetRecord {
                set_number: 1,
                home: 25,
                away: 27,
                winner: Some(Team::Away),
            }]
        );
        assert_eq!(m.current_set, 2);
        assert_eq!(m.winner, None);
    }

    #[test]
    fn deciding_set_uses_tie_break_points() {
        let mut m = test_match();
        m.current_set = 3; // best_of = 3
        score_n(&mut m, Team::Away, 15);
        score_n(&mut m, Team::Home, 12);

        m.start_new_set();

        let record = m.sets.last().unwrap();
        assert_eq!(record.winner, Some(Team::Away));
        assert_eq!(record.home, 12);
        assert_eq!(record.away, 15);
    }

    #[test]
    fn forced_close_on_exact_tie_records_no_winner() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 10);
        score_n(&mut m, Team::Away, 10);

        m.start_new_set();

        assert_eq!(m.sets[0].winner, None);
        assert_eq!(m.current_set, 2, "a tied set still advances the match");
    }

    #[test]
    fn match_concludes_after_enough_set_wins() {
        let mut m = test_match();

        for _ in 0..2 {
            score_n(&mut m, Team::Home, 25);
            m.start_new_set();
        }

        assert_eq!(m.winner, Some(Team::Home));
        assert_eq!(m.current_set, 2, "current set freezes at the final set");
        assert_eq!(m.sets.len(), 2);

        // A further call must not append another set or move the cursor.
        m.start_new_set();
        assert_eq!(m.sets.len(), 2);
        assert_eq!(m.current_set, 2);
    }

    #[test]
    fn undo_restores_previous_snapshot() {
        let mut m = test_match();
        m.update_score(Team::Home, 1);
        assert_eq!(m.scores.home, 1);

        m.undo();
        assert_eq!(m.scores.home, 0);
    }

    #[test]
    fn undo_depth_is_bounded_to_five() {
        let mut m = test_match();
        for _ in 0..6 {
            m.update_score(Team::Home, 1);
        }
        assert_eq!(m.history.len(), HISTORY_CAPACITY);

        for _ in 0..6 {
            m.undo();
        }
        // Five snapshots rewound one point each; the sixth undo is a no-op.
        assert_eq!(m.scores.home, 1);
        assert!(m.history.is_empty());

        let before = m.clone();
        m.undo();
        assert_eq!(m.scores, before.scores);
    }

    #[test]
    fn undo_restores_a_completed_set() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 3);
        m.start_new_set();
        assert_eq!(m.current_set, 2);

        m.undo();
        assert_eq!(m.current_set, 1);
        assert!(m.sets.is_empty());
        assert_eq!(m.scores.home, 3);
    }

    #[test]
    fn reset_clears_everything_but_identity_and_config() {
        let mut m = test_match();
        score_n(&mut m, Team::Home, 25);
        m.start_new_set();
        m.set_serving_team(Team::Away);

        m.reset();

        assert_eq!(m.scores, ScorePair::default());
        assert!(m.sets.is_empty());
        assert_eq!(m.current_set, 1);
        assert_eq!(m.serving_team, None);
        assert_eq!(m.winner, None);
        assert_eq!(m.id, "m1");
        assert_eq!(m.config.set_points, 25);
    }

    #[test]
    fn timeout_lifecycle() {
        let mut m = test_match();
        let history_len = m.history.len();

        m.start_timeout();
        assert!(m.timeout.active);
        assert_eq!(m.timeout.duration, TIMEOUT_DURATION_MS);
        assert_eq!(m.history.len(), history_len, "timeouts are not undoable");

        let started = m.timeout.start_time;
        assert!(!m.timeout_elapsed(started + 10_000));
        assert!(m.timeout_elapsed(started + 30_000));

        m.stop_timeout();
        assert!(!m.timeout.active);
        assert!(!m.timeout_elapsed(started + 60_000), "stopped clock never expires");
        assert_eq!(m.timeout.start_time, started, "start time kept as a record");

        // Stopping again is a harmless no-op.
        m.stop_timeout();
        assert!(!m.timeout.active);
    }

    #[test]
    fn patch_updates_named_fields_only() {
        let mut m = test_match();
        m.apply_patch(MatchPatch {
            home_team: Some("Eagles".into()),
            left_side_team: Some(Team::Away),
            is_live: Some(true),
            ..MatchPatch::default()
        });

        assert_eq!(m.home_team, "Eagles");
        assert_eq!(m.left_side_team, Team::Away);
        assert!(m.is_live);
        assert_eq!(m.away_team, "Away", "untouched fields survive");
        assert_eq!(m.name, "Test Match");
    }

    #[test]
    fn staleness_window() {
        let mut m = test_match();
        let day_ms = 24 * 60 * 60 * 1000;
        m.last_active = now_ms() - 25 * 60 * 60 * 1000;
        assert!(m.is_stale(now_ms(), day_ms));

        m.last_active = now_ms() - 60 * 60 * 1000;
        assert!(!m.is_stale(now_ms(), day_ms));
    }
}
