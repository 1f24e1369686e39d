use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::database::DegreeRepository;
use crate::error::ApiError;

/// Degree store of the tenant named in the session token, injected by middleware
#[derive(Clone)]
pub struct TenantDegrees(pub Arc<dyn DegreeRepository>);

/// Middleware that resolves the tenant database from JWT claims.
/// Must run after the auth gate so `AuthUser` is present.
pub async fn validate_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(auth_user) = request.extensions().get::<AuthUser>().cloned() else {
        return ApiError::unauthorized("JWT authentication required before tenant validation").into_response();
    };

    match state.tenants.degrees(&auth_user.database).await {
        Ok(repo) => {
            tracing::debug!("Tenant store resolved for: {}", auth_user.database);
            request.extensions_mut().insert(TenantDegrees(repo));
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Tenant validation failed for '{}': {}", auth_user.database, e);
            ApiError::from(e).into_response()
        }
    }
}
