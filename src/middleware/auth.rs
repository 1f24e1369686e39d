use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{verify_jwt, Claims};
use crate::error::ApiError;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub tenant: String,
    pub user: String,
    pub database: String,
    pub access: String,
    pub user_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            tenant: claims.tenant,
            user: claims.user,
            database: claims.database,
            access: claims.access,
            user_id: claims.user_id,
        }
    }
}

/// Paths reachable without a session token
const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/health",
    "/api/health",
    "/api/auth/**",
    "/auth/**",
    "/invitations/*",
    "/api/invitations/*",
    "/terms-condition",
];

static PUBLIC_PATTERNS: Lazy<Vec<Pattern>> =
    Lazy::new(|| PUBLIC_ROUTES.iter().filter_map(|route| Pattern::new(route).ok()).collect());

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATTERNS.iter().any(|pattern| pattern.matches_with(path, MATCH_OPTIONS))
}

const X_URL: &str = "x-url";
const X_ORIGIN: &str = "x-origin";
const X_PATHNAME: &str = "x-pathname";

/// Authentication gate applied to every request.
///
/// Public paths pass straight through. Everything else needs a valid bearer
/// token; API callers get a 401 envelope, page requests get redirected to the
/// login page with the original URL as `callbackUrl`.
pub async fn auth_gate_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let url = request_url(&request);

    // Forward the original location to downstream handlers
    if let Some(url) = &url {
        set_header(request.headers_mut(), X_URL, url.as_str());
        set_header(request.headers_mut(), X_ORIGIN, &url.origin().ascii_serialization());
    }
    set_header(request.headers_mut(), X_PATHNAME, &path);

    if is_public_path(&path) {
        return next.run(request).await;
    }

    let verified = extract_jwt_from_headers(request.headers())
        .and_then(|token| verify_jwt::<Claims>(&token, &state.config.security.jwt_secret).map_err(ApiError::from));

    match verified {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser::from(claims));
            next.run(request).await
        }
        Err(err) if path == "/api" || path.starts_with("/api/") => {
            tracing::debug!("Rejected unauthenticated API request to {}: {}", path, err);
            err.into_response()
        }
        Err(_) => {
            let callback = url.as_ref().map(|u| u.as_str()).unwrap_or(&path);
            Redirect::temporary(&login_redirect(callback)).into_response()
        }
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}

/// Reconstruct the absolute URL the client asked for
fn request_url(request: &Request) -> Option<url::Url> {
    let headers = request.headers();
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = request.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    url::Url::parse(&format!("{}://{}{}", scheme, host, path_and_query)).ok()
}

fn login_redirect(callback_url: &str) -> String {
    let callback: String = url::form_urlencoded::byte_serialize(callback_url.as_bytes()).collect();
    format!("/auth/login?callbackUrl={}", callback)
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
