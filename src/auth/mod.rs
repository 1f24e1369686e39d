use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Session token claims issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub tenant: String,
    pub user: String,
    pub database: String,
    pub access: String,
    pub user_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant: String, user: String, database: String, access: String, user_id: Uuid, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            tenant,
            user,
            database,
            access,
            user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

pub const PASSWORD_RESET_PURPOSE: &str = "password_reset";

/// Claims of a short-lived password reset token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetClaims {
    pub email: String,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
}

impl PasswordResetClaims {
    pub fn new(email: impl Into<String>, expiry_minutes: u64) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            purpose: PASSWORD_RESET_PURPOSE.to_string(),
            exp: (now + Duration::minutes(expiry_minutes as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Sign any claims set with the shared HS256 secret
pub fn generate_jwt<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the decoded claims
pub fn verify_jwt<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<T>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
