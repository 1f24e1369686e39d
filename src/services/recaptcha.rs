use serde::Deserialize;

use crate::config::RecaptchaConfig;

#[derive(Debug, thiserror::Error)]
pub enum RecaptchaError {
    #[error("Invalid reCAPTCHA. Please try again.")]
    Rejected,
    #[error("reCAPTCHA verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Server-side check of reCAPTCHA tokens against Google's siteverify API.
/// Verification is disabled unless both the site key and the secret key are set.
#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret_key: Option<String>,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(config: &RecaptchaConfig) -> Self {
        let secret_key = match (&config.site_key, &config.secret_key) {
            (Some(_), Some(secret)) => Some(secret.clone()),
            _ => None,
        };
        Self {
            client: reqwest::Client::new(),
            secret_key,
            verify_url: config.verify_url.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }

    pub async fn verify(&self, token: &str) -> Result<(), RecaptchaError> {
        let Some(secret) = self.secret_key.as_deref() else {
            return Ok(());
        };
        if token.is_empty() {
            return Err(RecaptchaError::Rejected);
        }

        let response: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .query(&[("secret", secret), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            tracing::debug!("reCAPTCHA rejected token: {:?}", response.error_codes);
            return Err(RecaptchaError::Rejected);
        }
        Ok(())
    }
}
