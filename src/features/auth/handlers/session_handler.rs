use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::error::Result;
use crate::features::auth::model::Identity;
use crate::features::reports::services::SessionRegistry;
use crate::shared::types::ApiResponse;

/// Response after signing out
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignOutResponseDto {
    pub signed_out: bool,
}

/// Get the current authenticated identity and start the live dashboard
/// session for it
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current identity", body = ApiResponse<Identity>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "session"
)]
pub async fn get_session(
    identity: Identity,
    State(registry): State<Arc<SessionRegistry>>,
) -> Result<Json<ApiResponse<Identity>>> {
    let session = registry.session_for(&identity);
    let current = session.provider().current_identity().unwrap_or(identity);
    Ok(Json(ApiResponse::success(Some(current), None, None)))
}

/// Sign out: tear down the caller's live feed session.
/// The identity provider owns the token lifecycle; this only ends the
/// dashboard session on this service.
#[utoipa::path(
    post,
    path = "/api/session/sign-out",
    responses(
        (status = 200, description = "Session ended", body = ApiResponse<SignOutResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "session"
)]
pub async fn sign_out(
    identity: Identity,
    State(registry): State<Arc<SessionRegistry>>,
) -> Result<Json<ApiResponse<SignOutResponseDto>>> {
    registry.sign_out(&identity.email);
    Ok(Json(ApiResponse::success(
        Some(SignOutResponseDto { signed_out: true }),
        None,
        None,
    )))
}
