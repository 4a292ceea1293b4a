//! REST payloads for the synchronous match query surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::match_state::{Match, MatchConfig};

/// Body accepted by `POST /api/matches`. Every field is optional; server-side
/// defaults fill the gaps.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateMatchRequest {
    /// Display name of the match.
    pub name: Option<String>,
    /// Home team label.
    pub home_team: Option<String>,
    /// Away team label.
    pub away_team: Option<String>,
    /// Opaque reference to the home team logo.
    pub home_logo: Option<String>,
    /// Opaque reference to the away team logo.
    pub away_logo: Option<String>,
    /// Opaque reference to a background image.
    pub background_image: Option<String>,
    /// Optional PIN gating write access from the control UI.
    pub pin: Option<String>,
    /// Ruleset overrides; omitted fields fall back to defaults.
    pub config: Option<MatchConfig>,
}

/// Full resident list plus the legacy active pointer, returned by
/// `GET /api/matches` and pushed on the realtime channel.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchListResponse {
    /// Every resident match in creation order.
    pub matches: Vec<Match>,
    /// Id of the first created match, if any.
    pub active_match_id: Option<String>,
}
