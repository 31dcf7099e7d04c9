use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use cofound_shared::errors::AppResult;
use cofound_shared::types::auth::AuthUser;
use cofound_shared::types::ApiResponse;

use crate::error::ConnectionError;
use crate::models::{Connection, ConnectionsOverview, RelationshipStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub receiver_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

async fn acting_profile_id(state: &AppState, user: &AuthUser) -> Result<Uuid, ConnectionError> {
    Ok(state.lifecycle.profile_for_credential(user.credential_id).await?.id)
}

// --- POST /connections ---

pub async fn create_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConnectionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Connection>>)> {
    let requester_id = acting_profile_id(&state, &user).await?;
    let connection = state.lifecycle.create_request(requester_id, req.receiver_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(connection))))
}

// --- PUT /connections/:id/accept ---

pub async fn accept_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Connection>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    let connection = state.lifecycle.accept(connection_id, profile_id).await?;
    Ok(Json(ApiResponse::ok(connection)))
}

// --- PUT /connections/:id/reject ---

pub async fn reject_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Connection>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    let connection = state.lifecycle.reject(connection_id, profile_id).await?;
    Ok(Json(ApiResponse::ok(connection)))
}

/// Deletes are idempotent over HTTP: a row that is already gone reports
/// `removed: false` instead of an error.
fn removed(result: Result<Connection, ConnectionError>) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    match result {
        Ok(_) => Ok(Json(ApiResponse::ok(RemovedResponse { removed: true }))),
        Err(ConnectionError::ConnectionNotFound(_)) => {
            Ok(Json(ApiResponse::ok(RemovedResponse { removed: false })))
        }
        Err(e) => Err(e.into()),
    }
}

// --- DELETE /connections/:id/withdraw ---

pub async fn withdraw_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    removed(state.lifecycle.withdraw(connection_id, profile_id).await)
}

// --- DELETE /connections/:id ---

pub async fn remove_connection(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    removed(state.lifecycle.remove(connection_id, profile_id).await)
}

// --- GET /connections ---

pub async fn list_connections(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ConnectionsOverview>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    let overview = state.lifecycle.connections_for_profile(profile_id).await?;
    Ok(Json(ApiResponse::ok(overview)))
}

// --- GET /connections/status/:profile_id ---

pub async fn relationship_status(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RelationshipStatus>>> {
    let profile_id = acting_profile_id(&state, &user).await?;
    let status = state.lifecycle.status_between(profile_id, other_id).await?;
    Ok(Json(ApiResponse::ok(status)))
}
