use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::matches::{CreateMatchRequest, MatchListResponse},
    error::AppError,
    services::match_service,
    state::{SharedState, match_state::Match},
};

#[utoipa::path(
    get,
    path = "/api/matches",
    tag = "matches",
    responses((status = 200, description = "All resident matches", body = MatchListResponse))
)]
/// List every resident match plus the legacy active pointer.
pub async fn list_matches(State(state): State<SharedState>) -> Json<MatchListResponse> {
    Json(match_service::match_list(&state))
}

#[utoipa::path(
    get,
    path = "/api/matches/{id}",
    tag = "matches",
    params(("id" = String, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "The resident match", body = Match),
        (status = 404, description = "No resident match with this id")
    )
)]
/// Read a single resident match.
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Match>, AppError> {
    match_service::get_match(&state, &id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("match `{id}` not found")))
}

#[utoipa::path(
    post,
    path = "/api/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses((status = 200, description = "The created match", body = Match))
)]
/// Create a match and broadcast the refreshed list to realtime clients.
pub async fn create_match(
    State(state): State<SharedState>,
    Json(request): Json<CreateMatchRequest>,
) -> Json<Match> {
    Json(match_service::create_match(&state, request))
}

/// Configure the match query subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/matches", get(list_matches).post(create_match))
        .route("/api/matches/{id}", get(get_match))
}
