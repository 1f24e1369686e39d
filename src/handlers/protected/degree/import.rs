use axum::{
    extract::{Extension, State},
    Json,
};

use crate::app::AppState;
use crate::import::{run_import, ImportOutcome, ImportRequest, ImportSummary};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantDegrees};
use crate::services::AuditAction;

/// POST /api/degree/import - Reconcile an uploaded batch with the stored degrees.
///
/// Responds with the written row counts, or `null` when the import method
/// is missing or unrecognized (nothing is written in that case).
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(TenantDegrees(repo)): Extension<TenantDegrees>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Option<ImportSummary>> {
    let rows = request.data_upload.len();
    let outcome = run_import(&*repo, request, state.config.import.update_concurrency).await?;

    if let ImportOutcome::Applied(summary) = &outcome {
        let description = format!(
            "{:?} import of {} rows: {} deleted, {} inserted, {} updated",
            summary.method, rows, summary.deleted, summary.inserted, summary.updated
        );
        state
            .report_audit(AuditAction::DegreeImport, &user, Some(description))
            .await;
    }

    Ok(ApiResponse::success(outcome.summary().copied()))
}
