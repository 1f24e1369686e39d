use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::TenantDirectory;
use crate::handlers;
use crate::middleware::{auth_gate_middleware, validate_tenant_middleware, AuthUser};
use crate::services::{AuditAction, AuditClient, AuditEvent, RecaptchaVerifier};

/// Shared services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tenants: Arc<dyn TenantDirectory>,
    pub recaptcha: Arc<RecaptchaVerifier>,
    /// Present only when Retraced is fully configured
    pub audit: Option<Arc<AuditClient>>,
}

impl AppState {
    pub fn new(config: AppConfig, tenants: Arc<dyn TenantDirectory>) -> Self {
        let recaptcha = Arc::new(RecaptchaVerifier::new(&config.recaptcha));
        if !recaptcha.is_enabled() {
            tracing::info!("reCAPTCHA secret key not configured; verification is disabled");
        }
        let audit = AuditClient::from_config(&config.retraced).map(Arc::new);
        if audit.is_none() {
            tracing::info!("Retraced not configured; audit events are disabled");
        }

        Self {
            config: Arc::new(config),
            tenants,
            recaptcha,
            audit,
        }
    }

    /// Record an audit event. Failures are logged and never reach the caller.
    pub async fn report_audit(&self, action: AuditAction, user: &AuthUser, description: Option<String>) {
        let Some(audit) = &self.audit else {
            return;
        };

        let mut event = AuditEvent::by(action, user);
        if let Some(description) = description {
            event = event.with_description(description);
        }
        if let Err(e) = audit.report_event(&event).await {
            tracing::warn!("Failed to report audit event {:?}: {}", action, e);
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(degree_routes(state.clone()))
        .merge(audit_routes())
        // The gate runs for unmatched paths too, so page requests get redirected
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new().route("/api/auth/forgot-password", post(auth::forgot_password_post))
}

fn degree_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::degree;

    Router::new()
        .route(
            "/api/degree",
            get(degree::list_get).post(degree::create_post).delete(degree::delete_all),
        )
        .route("/api/degree/import", post(degree::import_post))
        .route(
            "/api/degree/:id",
            get(degree::record_get).put(degree::record_put).delete(degree::record_delete),
        )
        .route_layer(middleware::from_fn_with_state(state, validate_tenant_middleware))
}

fn audit_routes() -> Router<AppState> {
    use handlers::protected::audit;

    Router::new().route("/api/audit/viewer-token", get(audit::viewer_token_get))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Backoffice API",
            "version": version,
            "description": "Tenant back-office API for degree catalogues",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/api/auth/forgot-password (public)",
                "degree": "/api/degree[/:id] (protected)",
                "import": "/api/degree/import (protected)",
                "audit": "/api/audit/viewer-token (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.tenants.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
