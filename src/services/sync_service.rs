//! Folding externally-originated record updates back into resident state.
//!
//! Edits made directly against the record store (e.g. from a management
//! dashboard) arrive on the store's change stream; resident matches absorb
//! them as a details patch and the result is re-broadcast.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::models::MatchRecord,
    services::match_service,
    state::SharedState,
};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Keep a change subscription open against whichever store is installed,
/// resubscribing with backoff whenever the stream drops.
pub async fn run(state: SharedState) {
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        let Some(store) = state.store().await else {
            sleep(delay).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY);
            continue;
        };

        match store.changes().await {
            Ok(mut changes) => {
                info!("subscribed to external record updates");
                delay = INITIAL_RETRY_DELAY;
                while let Some(record) = changes.next().await {
                    apply_external_update(&state, record);
                }
                warn!("external update stream ended; resubscribing");
            }
            Err(err) => {
                warn!(error = %err, "failed to subscribe to external updates");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

/// Merge one external record update into memory and notify clients.
///
/// Non-resident matches are skipped: they will pick the change up on their
/// next hydration.
pub fn apply_external_update(state: &SharedState, record: MatchRecord) {
    let match_id = record.id.clone();

    let Some(updated) = state.registry().apply_patch(&match_id, record.into_patch()) else {
        debug!(match_id, "external update for non-resident match ignored");
        return;
    };

    info!(match_id, "applied external record update");
    match_service::broadcast_match(state, &updated);
    match_service::broadcast_list(state);
}
