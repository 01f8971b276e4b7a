//! Axum route handlers for the creation feed.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::errors::AppError;
use crate::extractors::json::AppJson;
use crate::models::creation::CreationRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreationListResponse {
    pub success: bool,
    pub creations: Vec<CreationRow>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleLikeRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/user/get-user-creations
pub async fn handle_get_user_creations(
    auth: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<CreationListResponse>, AppError> {
    let creations = state.creations.list_by_user(&auth.user_id).await?;
    Ok(Json(CreationListResponse {
        success: true,
        creations,
    }))
}

/// GET /api/user/get-published-creations
pub async fn handle_get_published_creations(
    _auth: AuthContext,
    State(state): State<AppState>,
) -> Result<Json<CreationListResponse>, AppError> {
    let creations = state.creations.list_published().await?;
    Ok(Json(CreationListResponse {
        success: true,
        creations,
    }))
}

/// POST /api/user/toggle-like-creation
pub async fn handle_toggle_like(
    auth: AuthContext,
    State(state): State<AppState>,
    AppJson(request): AppJson<ToggleLikeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = state
        .creations
        .toggle_like(request.id, &auth.user_id)
        .await?;

    info!("User {} toggled like on {}: {:?}", auth.user_id, request.id, outcome);

    Ok(Json(MessageResponse {
        success: true,
        message: outcome.message().to_string(),
    }))
}
