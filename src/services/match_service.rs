//! Action handlers bridging the realtime gateway, the match registry, and
//! the persistence layer.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::MatchSaveRequest,
    dto::{
        matches::{CreateMatchRequest, MatchListResponse},
        ws::{ClientMessage, ServerMessage},
    },
    error::ServiceError,
    services::timeout_service,
    state::{SharedState, match_state::Match},
};

/// Current resident list plus the active pointer.
pub fn match_list(state: &SharedState) -> MatchListResponse {
    let (matches, active_match_id) = state.registry().all();
    MatchListResponse {
        matches,
        active_match_id,
    }
}

/// Payload sent once to each newly connected client.
pub fn initial_state(state: &SharedState) -> ServerMessage {
    ServerMessage::InitState(match_list(state))
}

/// Resident match by id, used by the REST read endpoint.
pub fn get_match(state: &SharedState, id: &str) -> Option<Match> {
    state.registry().get(id)
}

/// Create a match and notify every connection so open dashboards stay
/// current. Also used by the REST create endpoint.
pub fn create_match(state: &SharedState, request: CreateMatchRequest) -> Match {
    let created = state.registry().create(request);
    info!(match_id = %created.id, name = %created.name, "created match");
    state
        .rooms()
        .broadcast_all(&ServerMessage::MatchesUpdated(match_list(state)));
    created
}

/// Subscribe a connection to a match room, hydrating the match from storage
/// when it is not resident. The requester alone learns about a miss.
pub async fn join_match(state: &SharedState, connection_id: Uuid, match_id: &str) {
    state.rooms().join(match_id, connection_id);

    if let Some(m) = state.registry().get(match_id) {
        state
            .rooms()
            .send_to(connection_id, &ServerMessage::MatchUpdate(m));
        return;
    }

    match hydrate(state, match_id).await {
        Ok(m) => {
            state
                .rooms()
                .send_to(connection_id, &ServerMessage::MatchUpdate(m));
        }
        Err(err) => {
            match &err {
                ServiceError::NotFound(_) => info!(match_id, "join for unknown match"),
                other => warn!(match_id, error = %other, "hydration failed"),
            }
            state.rooms().send_to(
                connection_id,
                &ServerMessage::MatchNotFound {
                    match_id: match_id.to_string(),
                },
            );
        }
    }
}

/// Reconstruct a match from its persisted record and make it resident.
async fn hydrate(state: &SharedState, match_id: &str) -> Result<Match, ServiceError> {
    let store = state.store().await.ok_or(ServiceError::Degraded)?;
    let record = store
        .find_match(match_id.to_string())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))?;

    let m = record.into_match();
    state.registry().insert(m.clone());
    info!(match_id, "hydrated match from storage");
    Ok(m)
}

/// Route one inbound client message to the matching registry operation and
/// fan out the result.
///
/// A message naming an id that is not resident broadcasts nothing: the
/// mutation is an idempotent no-op, never a connection error.
pub async fn handle_message(state: &SharedState, connection_id: Uuid, message: ClientMessage) {
    match message {
        ClientMessage::JoinMatch { match_id } => {
            join_match(state, connection_id, &match_id).await;
        }
        ClientMessage::UpdateScore {
            match_id,
            team,
            delta,
        } => {
            if let Some(m) = state
                .registry()
                .mutate(&match_id, |m| m.update_score(team, delta))
            {
                broadcast_match(state, &m);
                spawn_save(state, &m);
            }
        }
        ClientMessage::StartNewSet { match_id } => {
            if let Some(m) = state.registry().mutate(&match_id, |m| m.start_new_set()) {
                broadcast_match(state, &m);
                spawn_save(state, &m);
                broadcast_list(state);
            }
        }
        ClientMessage::SetServingTeam { match_id, team } => {
            if let Some(m) = state
                .registry()
                .mutate(&match_id, |m| m.set_serving_team(team))
            {
                broadcast_match(state, &m);
                spawn_save(state, &m);
            }
        }
        ClientMessage::UpdateMatchDetails { match_id, data } => {
            if let Some(m) = state.registry().apply_patch(&match_id, data) {
                broadcast_match(state, &m);
                broadcast_list(state);
            }
        }
        ClientMessage::ResetMatch { match_id } => {
            if let Some(m) = state.registry().mutate(&match_id, |m| m.reset()) {
                broadcast_match(state, &m);
                spawn_save(state, &m);
                broadcast_list(state);
            }
        }
        ClientMessage::Undo { match_id } => {
            if let Some(m) = state.registry().mutate(&match_id, |m| m.undo()) {
                broadcast_match(state, &m);
                spawn_save(state, &m);
            }
        }
        ClientMessage::StartTimeout { match_id } => {
            if let Some(m) = state.registry().mutate(&match_id, |m| m.start_timeout()) {
                broadcast_match(state, &m);
                timeout_service::schedule_auto_stop(state, &match_id);
            }
        }
        ClientMessage::StopTimeout { match_id } => {
            state.cancel_timeout_task(&match_id);
            if let Some(m) = state.registry().mutate(&match_id, |m| m.stop_timeout()) {
                broadcast_match(state, &m);
            }
        }
        ClientMessage::ToggleFinalResult { match_id } => {
            if let Some(m) = state
                .registry()
                .mutate(&match_id, |m| m.toggle_final_result())
            {
                broadcast_match(state, &m);
            }
        }
        ClientMessage::Unknown => {
            debug!(%connection_id, "ignoring unrecognized client message");
        }
    }
}

/// Send the fresh match state to its room.
pub fn broadcast_match(state: &SharedState, m: &Match) {
    state
        .rooms()
        .broadcast_room(&m.id, &ServerMessage::MatchUpdate(m.clone()));
}

/// Send the full list to every connection after a structural change.
pub fn broadcast_list(state: &SharedState) {
    state
        .rooms()
        .broadcast_all(&ServerMessage::MatchesUpdated(match_list(state)));
}

/// Persist the durable subset of a match without blocking the realtime path.
/// Failures are logged and never roll back the in-memory mutation.
fn spawn_save(state: &SharedState, m: &Match) {
    let state = state.clone();
    let match_id = m.id.clone();
    let update = MatchSaveRequest::from(m);

    tokio::spawn(async move {
        let Some(store) = state.store().await else {
            debug!(match_id, "skipping save, no store installed");
            return;
        };
        match store.save_match(match_id.clone(), update).await {
            Ok(()) => debug!(match_id, "persisted match"),
            Err(err) => warn!(match_id, error = %err, "failed to persist match"),
        }
    });
}
