//! Shared application state: resident matches, rooms, and the storage slot.

pub mod match_state;
pub mod registry;
pub mod rooms;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;

use crate::dao::storage::MatchStore;
use self::{registry::MatchRegistry, rooms::RoomRegistry};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state shared by the realtime gateway, the REST
/// surface, and the background schedulers.
pub struct AppState {
    registry: MatchRegistry,
    rooms: RoomRegistry,
    store: RwLock<Option<Arc<dyn MatchStore>>>,
    timeout_tasks: DashMap<String, AbortHandle>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a store is installed.
    pub fn new() -> SharedState {
        Arc::new(Self {
            registry: MatchRegistry::new(),
            rooms: RoomRegistry::new(),
            store: RwLock::new(None),
            timeout_tasks: DashMap::new(),
        })
    }

    /// The resident match registry.
    pub fn registry(&self) -> &MatchRegistry {
        &self.registry
    }

    /// Connection and room registry for the realtime gateway.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a match store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn MatchStore>) {
        let mut guard = self.store.write().await;
        *guard = Some(store);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_store(&self) {
        let mut guard = self.store.write().await;
        guard.take();
    }

    /// Whether the application currently runs without persistence.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Remember the deferred auto-expiry task for a match, aborting any
    /// previous one so a restarted timeout cannot be stopped by a stale task.
    pub fn arm_timeout_task(&self, match_id: &str, handle: AbortHandle) {
        if let Some(previous) = self.timeout_tasks.insert(match_id.to_string(), handle) {
            previous.abort();
        }
    }

    /// Abort and forget the deferred auto-expiry task for a match, if any.
    pub fn cancel_timeout_task(&self, match_id: &str) {
        if let Some((_, handle)) = self.timeout_tasks.remove(match_id) {
            handle.abort();
        }
    }

    /// Drop the bookkeeping entry for a deferred auto-expiry task without
    /// aborting it, used by the task itself once its check has run.
    pub fn forget_timeout_task(&self, match_id: &str) {
        self.timeout_tasks.remove(match_id);
    }

    /// Whether a deferred auto-expiry task is tracked for a match.
    pub fn has_timeout_task(&self, match_id: &str) -> bool {
        self.timeout_tasks.contains_key(match_id)
    }

    /// Run the eviction sweep and drop timer bookkeeping for every evicted
    /// match, returning the eviction count.
    pub fn evict_stale_matches(&self) -> usize {
        let evicted = self.registry.cleanup();
        for match_id in &evicted {
            self.cancel_timeout_task(match_id);
        }
        evicted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dto::matches::CreateMatchRequest;
    use crate::state::match_state::now_ms;

    #[tokio::test]
    async fn eviction_drops_timer_bookkeeping() {
        let state = AppState::new();
        let m = state.registry().create(CreateMatchRequest::default());
        state.registry().mutate(&m.id, |m| {
            m.last_active = now_ms() - 25 * 60 * 60 * 1000;
        });
        let task = tokio::spawn(async {});
        state.arm_timeout_task(&m.id, task.abort_handle());

        assert_eq!(state.evict_stale_matches(), 1);
        assert!(!state.registry().contains(&m.id));
        assert!(!state.has_timeout_task(&m.id));
    }

    #[tokio::test]
    async fn eviction_leaves_fresh_matches_and_their_timers() {
        let state = AppState::new();
        let m = state.registry().create(CreateMatchRequest::default());
        let task = tokio::spawn(async {});
        state.arm_timeout_task(&m.id, task.abort_handle());

        assert_eq!(state.evict_stale_matches(), 0);
        assert!(state.registry().contains(&m.id));
        assert!(state.has_timeout_task(&m.id));
    }
}
