//! Resident match registry: the single owner of all in-memory matches.

use dashmap::DashMap;
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::dto::matches::CreateMatchRequest;
use crate::state::match_state::{Match, MatchPatch, Team, now_ms};

/// Retention window after which inactive matches are evicted from memory.
pub const RETENTION_MS: i64 = 24 * 60 * 60 * 1000;

/// In-memory collection of matches keyed by id.
///
/// Entry-level locking in the map gives each match its own mutual-exclusion
/// scope; mutations run to completion against one entry and never suspend,
/// so broadcasts observe complete states.
pub struct MatchRegistry {
    matches: DashMap<String, Match>,
    // Legacy convenience pointer: the first created match. Kept for the
    // initial-sync payload, not load-bearing for correctness.
    active_match_id: RwLock<Option<String>>,
}

impl MatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            active_match_id: RwLock::new(None),
        }
    }

    /// Create a new match with defaults merged over the request and make it
    /// resident. The first match created becomes the active pointer.
    pub fn create(&self, request: CreateMatchRequest) -> Match {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();

        let m = Match {
            id: id.clone(),
            name: request.name.unwrap_or_else(|| "Untitled Match".into()),
            home_team: request.home_team.unwrap_or_else(|| "Home".into()),
            away_team: request.away_team.unwrap_or_else(|| "Away".into()),
            home_logo: request.home_logo,
            away_logo: request.away_logo,
            background_image: request.background_image,
            pin: request.pin,
            config: request.config.unwrap_or_default(),
            sets: Vec::new(),
            current_set: 1,
            scores: Default::default(),
            serving_team: None,
            left_side_team: Team::Home,
            winner: None,
            timeout: Default::default(),
            show_final_result: false,
            is_live: false,
            last_active: now,
            created_at: now,
            history: Default::default(),
        };

        self.matches.insert(id.clone(), m.clone());

        let mut active = self.active_match_id.write().expect("active pointer lock");
        if active.is_none() {
            *active = Some(id);
        }

        m
    }

    /// Insert a match reconstructed from persistent storage.
    pub fn insert(&self, m: Match) {
        self.matches.insert(m.id.clone(), m);
    }

    /// Clone of the resident match with the given id, if any.
    pub fn get(&self, id: &str) -> Option<Match> {
        self.matches.get(id).map(|entry| entry.clone())
    }

    /// Whether a match with the given id is resident.
    pub fn contains(&self, id: &str) -> bool {
        self.matches.contains_key(id)
    }

    /// All resident matches in creation order, plus the active pointer.
    pub fn all(&self) -> (Vec<Match>, Option<String>) {
        let mut matches: Vec<Match> = self.matches.iter().map(|e| e.clone()).collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let active = self.active_match_id.read().expect("active pointer lock").clone();
        (matches, active)
    }

    /// Run `mutate` against the resident match with the given id, returning a
    /// clone of the resulting state for broadcast. `None` when not resident.
    pub fn mutate(&self, id: &str, mutate: impl FnOnce(&mut Match)) -> Option<Match> {
        let mut entry = self.matches.get_mut(id)?;
        mutate(&mut entry);
        Some(entry.clone())
    }

    /// Apply a details patch, returning the updated match when resident.
    pub fn apply_patch(&self, id: &str, patch: MatchPatch) -> Option<Match> {
        self.mutate(id, |m| m.apply_patch(patch))
    }

    /// Evict every match inactive beyond [`RETENTION_MS`], returning the
    /// evicted ids. Memory-only; persisted records survive.
    pub fn cleanup(&self) -> Vec<String> {
        let now = now_ms();
        let mut evicted = Vec::new();
        self.matches.retain(|id, m| {
            if m.is_stale(now, RETENTION_MS) {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        if !evicted.is_empty() {
            info!(removed = evicted.len(), "evicted inactive matches from memory");
        }
        evicted
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_state::ScorePair;

    fn create_default(registry: &MatchRegistry) -> Match {
        registry.create(CreateMatchRequest::default())
    }

    #[test]
    fn create_applies_defaults() {
        let registry = MatchRegistry::new();
        let m = create_default(&registry);

        assert_eq!(m.name, "Untitled Match");
        assert_eq!(m.home_team, "Home");
        assert_eq!(m.away_team, "Away");
        assert_eq!(m.config.best_of, 3);
        assert_eq!(m.config.set_points, 25);
        assert_eq!(m.config.tie_break_points, 15);
        assert_eq!(m.current_set, 1);
        assert_eq!(m.scores, ScorePair::default());
        assert!(registry.contains(&m.id));
    }

    #[test]
    fn first_match_becomes_active_pointer() {
        let registry = MatchRegistry::new();
        let first = create_default(&registry);
        let _second = create_default(&registry);

        let (matches, active) = registry.all();
        assert_eq!(matches.len(), 2);
        assert_eq!(active.as_deref(), Some(first.id.as_str()));
    }

    #[test]
    fn mutate_unknown_id_is_none() {
        let registry = MatchRegistry::new();
        assert!(registry.mutate("missing", |m| m.update_score(Team::Home, 1)).is_none());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn mutation_is_visible_to_readers() {
        let registry = MatchRegistry::new();
        let m = create_default(&registry);

        let updated = registry
            .mutate(&m.id, |m| m.update_score(Team::Away, 1))
            .unwrap();
        assert_eq!(updated.scores.away, 1);
        assert_eq!(registry.get(&m.id).unwrap().scores.away, 1);
    }

    #[test]
    fn cleanup_evicts_only_stale_matches() {
        let registry = MatchRegistry::new();
        let stale = create_default(&registry);
        let fresh = create_default(&registry);

        registry
            .mutate(&stale.id, |m| {
                m.last_active = now_ms() - 25 * 60 * 60 * 1000;
            })
            .unwrap();
        registry
            .mutate(&fresh.id, |m| {
                m.last_active = now_ms() - 60 * 60 * 1000;
            })
            .unwrap();

        assert_eq!(registry.cleanup(), vec![stale.id.clone()]);
        assert!(!registry.contains(&stale.id));
        assert!(registry.contains(&fresh.id));
    }
}
