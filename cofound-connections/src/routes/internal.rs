use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use cofound_shared::errors::AppResult;
use cofound_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectedIdsResponse {
    pub profile_id: Uuid,
    pub connected_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ConnectedResponse {
    pub connected: bool,
}

/// GET /internal/connected-ids/:profile_id: accepted counterparts (service-to-service, no auth)
pub async fn connected_ids(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ConnectedIdsResponse>>> {
    let connected_ids = state.lifecycle.connected_ids(profile_id).await?;
    Ok(Json(ApiResponse::ok(ConnectedIdsResponse { profile_id, connected_ids })))
}

/// GET /internal/connected/:a/:b: messaging gate (service-to-service, no auth)
pub async fn are_connected(
    State(state): State<Arc<AppState>>,
    Path((a, b)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<ConnectedResponse>>> {
    let connected = state.lifecycle.are_connected(a, b).await?;
    Ok(Json(ApiResponse::ok(ConnectedResponse { connected })))
}
