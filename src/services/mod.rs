pub mod audit;
pub mod recaptcha;

pub use audit::{AuditAction, AuditClient, AuditError, AuditEvent};
pub use recaptcha::{RecaptchaError, RecaptchaVerifier};
