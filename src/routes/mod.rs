use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod health;
pub mod matches;
pub mod websocket;

/// Compose the API route trees, mount the Swagger UI, and wire in shared
/// state.
pub fn router(state: SharedState) -> Router<()> {
    let swagger = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    health::router()
        .merge(matches::router())
        .merge(websocket::router())
        .merge(swagger)
        .with_state(state)
}
