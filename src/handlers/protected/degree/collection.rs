use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::{BulkResult, Degree, DegreeFilter, DegreeInput, DegreeQuery};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantDegrees};
use crate::services::AuditAction;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search_key: Option<String>,
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListQuery {
    fn into_query(self, max_page_size: i64) -> Result<DegreeQuery, ApiError> {
        let page_index = self.page_index.unwrap_or(0);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_index < 0 {
            return Err(ApiError::field_error("pageIndex", "pageIndex must not be negative"));
        }
        if page_size < 1 {
            return Err(ApiError::field_error("pageSize", "pageSize must be at least 1"));
        }

        Ok(DegreeQuery {
            filter: DegreeFilter::search(self.search_key.unwrap_or_default()),
            page_index,
            page_size: page_size.min(max_page_size),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegreePage {
    pub query_data: Vec<Degree>,
    pub row_count: i64,
}

/// Reject inputs without a usable name
pub(super) fn validate_input(input: &DegreeInput) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::field_error("name", "Name is required"));
    }
    Ok(())
}

/// GET /api/degree - Page through degrees matching `searchKey`
pub async fn list(
    State(state): State<AppState>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
    Query(query): Query<ListQuery>,
) -> ApiResult<DegreePage> {
    let query = query.into_query(state.config.api.max_page_size)?;

    let row_count = repo.count(&query.filter).await?;
    let query_data = repo.find_many(&query).await?;

    Ok(ApiResponse::success(DegreePage { query_data, row_count }))
}

/// POST /api/degree - Create a single degree
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
    Json(input): Json<DegreeInput>,
) -> ApiResult<Degree> {
    validate_input(&input)?;

    let degree = repo.create(input).await?;
    state
        .report_audit(AuditAction::DegreeCreate, &user, Some(degree.name.clone()))
        .await;

    Ok(ApiResponse::created(degree))
}

/// DELETE /api/degree - Remove every degree of the tenant
pub async fn delete_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
) -> ApiResult<BulkResult> {
    let result = repo.delete_many().await?;
    tracing::info!("Deleted {} degrees from {}", result.count, user.database);
    state.report_audit(AuditAction::DegreeDeleteAll, &user, None).await;

    Ok(ApiResponse::success(result))
}
