use axum::{
    extract::{Extension, Path, State},
    Json,
};
use uuid::Uuid;

use super::collection::validate_input;
use crate::app::AppState;
use crate::database::{Degree, DegreeInput};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantDegrees};
use crate::services::AuditAction;

/// GET /api/degree/:id - Get a single degree by ID
pub async fn get(
    Path(id): Path<Uuid>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
) -> ApiResult<Degree> {
    match repo.find_unique(id).await? {
        Some(degree) => Ok(ApiResponse::success(degree)),
        None => Err(ApiError::not_found(format!("Degree {} not found", id))),
    }
}

/// PUT /api/degree/:id - Overwrite name and description
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
    Json(input): Json<DegreeInput>,
) -> ApiResult<Degree> {
    validate_input(&input)?;

    let degree = repo.update(id, input).await?;
    state
        .report_audit(AuditAction::DegreeUpdate, &user, Some(degree.name.clone()))
        .await;

    Ok(ApiResponse::success(degree))
}

/// DELETE /api/degree/:id - Delete and return a single degree
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
) -> ApiResult<Degree> {
    let degree = repo.delete(id).await?;
    state
        .report_audit(AuditAction::DegreeDelete, &user, Some(degree.name.clone()))
        .await;

    Ok(ApiResponse::success(degree))
}
