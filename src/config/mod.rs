use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub recaptcha: RecaptchaConfig,
    pub retraced: RetracedConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base connection URL; the path is swapped per database by `DatabaseManager`
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_page_size: i64,
    /// Public base URL used when building links sent to users
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub password_reset_expiry_minutes: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecaptchaConfig {
    pub site_key: Option<String>,
    pub secret_key: Option<String>,
    pub verify_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetracedConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Upper bound on per-name updates in flight during an UPDATE import
    pub update_concurrency: usize,
    /// Wrap each import in a database transaction when the store supports it
    pub transactional: bool,
}

pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = env::var("API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_APP_URL") {
            self.api.app_url = v.trim_end_matches('/').to_string();
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_RESET_EXPIRY_MINUTES") {
            self.security.password_reset_expiry_minutes =
                v.parse().unwrap_or(self.security.password_reset_expiry_minutes);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // reCAPTCHA overrides
        if let Ok(v) = env::var("RECAPTCHA_SITE_KEY") {
            self.recaptcha.site_key = non_empty(v);
        }
        if let Ok(v) = env::var("RECAPTCHA_SECRET_KEY") {
            self.recaptcha.secret_key = non_empty(v);
        }
        if let Ok(v) = env::var("RECAPTCHA_VERIFY_URL") {
            self.recaptcha.verify_url = v;
        }

        // Retraced overrides
        if let Ok(v) = env::var("RETRACED_URL") {
            self.retraced.url = non_empty(v.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("RETRACED_API_KEY") {
            self.retraced.api_key = non_empty(v);
        }
        if let Ok(v) = env::var("RETRACED_PROJECT_ID") {
            self.retraced.project_id = non_empty(v);
        }

        // Import overrides
        if let Ok(v) = env::var("IMPORT_UPDATE_CONCURRENCY") {
            self.import.update_concurrency = v.parse().unwrap_or(self.import.update_concurrency);
        }
        if let Ok(v) = env::var("IMPORT_TRANSACTIONAL") {
            self.import.transactional = v.parse().unwrap_or(self.import.transactional);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 1000,
                app_url: "http://localhost:3000".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                password_reset_expiry_minutes: 60,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            recaptcha: RecaptchaConfig {
                verify_url: RECAPTCHA_VERIFY_URL.to_string(),
                ..Default::default()
            },
            retraced: RetracedConfig::default(),
            import: ImportConfig {
                update_concurrency: 8,
                transactional: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 500,
                app_url: "https://staging.example.com".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                password_reset_expiry_minutes: 30,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            recaptcha: RecaptchaConfig {
                verify_url: RECAPTCHA_VERIFY_URL.to_string(),
                ..Default::default()
            },
            retraced: RetracedConfig::default(),
            import: ImportConfig {
                update_concurrency: 8,
                transactional: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                max_page_size: 100,
                app_url: "https://app.example.com".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                password_reset_expiry_minutes: 15,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            recaptcha: RecaptchaConfig {
                verify_url: RECAPTCHA_VERIFY_URL.to_string(),
                ..Default::default()
            },
            retraced: RetracedConfig::default(),
            import: ImportConfig {
                update_concurrency: 16,
                transactional: true,
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
