use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use cofound_shared::errors::AppResult;
use cofound_shared::types::auth::AuthUser;
use cofound_shared::types::{ApiResponse, CursorPage};

use crate::models::Profile;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct DiscoveryParams {
    #[validate(range(min = 1, max = 50, message = "limit must be between 1 and 50"))]
    pub limit: Option<usize>,
    /// Cursor from the previous page's `next_cursor`.
    pub after: Option<Uuid>,
}

/// GET /discovery?limit=20&after=<uuid>
pub async fn discovery_deck(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoveryParams>,
) -> AppResult<Json<ApiResponse<CursorPage<Profile>>>> {
    params.validate()?;

    let viewer = state.lifecycle.profile_for_credential(user.credential_id).await?;
    let limit = params.limit.unwrap_or_else(|| state.config.discovery_limit());

    let page = state.discovery.candidates(viewer.id, limit, params.after).await?;
    Ok(Json(ApiResponse::ok(page)))
}
