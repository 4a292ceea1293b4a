//! Deferred auto-expiry of match timeouts.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    dto::ws::ServerMessage,
    state::{SharedState, match_state::now_ms},
};

/// Delay before the auto-expiry check fires: the nominal 30 s window plus a
/// buffer for scheduling jitter.
pub const AUTO_STOP_DELAY: Duration = Duration::from_millis(30_500);

/// Arm the deferred auto-expiry task for a freshly started timeout.
///
/// The task handle is kept on the shared state so a manual stop (or a
/// restart, which arms a new task) aborts it directly.
pub fn schedule_auto_stop(state: &SharedState, match_id: &str) {
    let task_state = state.clone();
    let task_match_id = match_id.to_string();

    let task = tokio::spawn(async move {
        sleep(AUTO_STOP_DELAY).await;
        expire_if_elapsed(&task_state, &task_match_id);
    });

    state.arm_timeout_task(match_id, task.abort_handle());
}

/// Stop the timeout if it is still running and its nominal duration has
/// actually elapsed. The elapsed check protects a timeout that was stopped
/// and restarted inside the deferred window from a stale task.
pub fn expire_if_elapsed(state: &SharedState, match_id: &str) {
    // Whichever way the check goes, this task is done: drop its bookkeeping
    // entry so the map does not accumulate handles for finished tasks. Any
    // task that reaches this point owns the entry, because a restart or a
    // manual stop would have aborted it first.
    state.forget_timeout_task(match_id);

    let Some(m) = state.registry().get(match_id) else {
        return;
    };
    if !m.timeout_elapsed(now_ms()) {
        debug!(match_id, "deferred timeout check found nothing to stop");
        return;
    }

    if let Some(updated) = state.registry().mutate(match_id, |m| m.stop_timeout()) {
        info!(match_id, "timeout expired");
        state
            .rooms()
            .broadcast_room(match_id, &ServerMessage::MatchUpdate(updated));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{dto::matches::CreateMatchRequest, state::AppState};

    #[test]
    fn deferred_check_ignores_running_timeout() {
        let state = AppState::new();
        let m = state.registry().create(CreateMatchRequest::default());
        state.registry().mutate(&m.id, |m| m.start_timeout());

        expire_if_elapsed(&state, &m.id);

        let current = state.registry().get(&m.id).expect("resident");
        assert!(current.timeout.active);
    }

    #[test]
    fn deferred_check_stops_an_elapsed_timeout() {
        let state = AppState::new();
        let m = state.registry().create(CreateMatchRequest::default());
        state.registry().mutate(&m.id, |m| {
            m.start_timeout();
            m.timeout.start_time = now_ms() - m.timeout.duration as i64 - 1;
        });

        expire_if_elapsed(&state, &m.id);

        let current = state.registry().get(&m.id).expect("resident");
        assert!(!current.timeout.active);
    }

    #[test]
    fn deferred_check_for_unknown_match_is_a_no_op() {
        let state = AppState::new();
        expire_if_elapsed(&state, "ghost");
    }

    #[tokio::test]
    async fn elapsed_expiry_clears_task_tracking() {
        let state = AppState::new();
        let m = state.registry().create(CreateMatchRequest::default());
        state.registry().mutate(&m.id, |m| {
            m.start_timeout();
            m.timeout.start_time = now_ms() - m.timeout.duration as i64 - 1;
        });
        let task = tokio::spawn(async {});
        state.arm_timeout_task(&m.id, task.abort_handle());

        expire_if_elapsed(&state, &m.id);

        let current = state.registry().get(&m.id).expect("resident");
        assert!(!current.timeout.active);
        assert!(!state.has_timeout_task(&m.id));
    }

    #[tokio::test]
    async fn expiry_for_evicted_match_clears_task_tracking() {
        let state = AppState::new();
        let task = tokio::spawn(async {});
        state.arm_timeout_task("gone", task.abort_handle());

        expire_if_elapsed(&state, "gone");

        assert!(!state.has_timeout_task("gone"));
    }
}
