use axum::{extract::State, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{generate_jwt, PasswordResetClaims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+$").expect("email pattern is valid"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub recaptcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: &'static str,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::field_error("email", "Email is required"));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ApiError::field_error("email", "Email is invalid"));
    }
    Ok(())
}

/// POST /api/auth/forgot-password - Issue a password reset link
pub async fn forgot_password_post(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> ApiResult<ForgotPasswordResponse> {
    validate_email(&request.email)?;
    state.recaptcha.verify(&request.recaptcha_token).await?;

    let security = &state.config.security;
    let claims = PasswordResetClaims::new(request.email.trim(), security.password_reset_expiry_minutes);
    let token = generate_jwt(&claims, &security.jwt_secret)?;
    let link = format!("{}/auth/reset-password/{}", state.config.api.app_url, token);

    tracing::info!("Password reset requested");
    tracing::debug!("Password reset link for {}: {}", claims.email, link);

    Ok(ApiResponse::success(ForgotPasswordResponse {
        message: "Password reset link sent",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_must_be_present_and_shaped() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a@b").is_ok());

        let missing = validate_email("").unwrap_err();
        assert_eq!(missing.to_json()["field_errors"]["email"], "Email is required");

        let invalid = validate_email("user example.com").unwrap_err();
        assert_eq!(invalid.to_json()["field_errors"]["email"], "Email is invalid");
        assert!(validate_email("user @example.com").is_err());
    }
}
