use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Volley Board Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::list_matches,
        crate::routes::matches::get_match,
        crate::routes::matches::create_match,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::MatchListResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::state::match_state::Match,
            crate::state::match_state::MatchConfig,
            crate::state::match_state::MatchPatch,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Synchronous match queries"),
        (name = "realtime", description = "WebSocket operations for control and display clients"),
    )
)]
pub struct ApiDoc;
