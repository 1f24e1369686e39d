use axum::extract::{Extension, State};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct ViewerToken {
    pub token: String,
}

/// GET /api/audit/viewer-token - Token for browsing the tenant's audit log.
/// The group is the tenant database and the actor is the signed-in user.
pub async fn viewer_token_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ViewerToken> {
    let audit = state
        .audit
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Audit logging is not configured"))?;

    let token = audit.viewer_token(&user.database, &user.user_id.to_string()).await?;

    Ok(ApiResponse::success(ViewerToken { token }))
}
