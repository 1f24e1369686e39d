use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::postgres::PgDegreeRepository;
use crate::database::repository::DegreeRepository;
use crate::database::tenants::TenantDirectory;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid tenant database name: {0}")]
    InvalidTenantName(String),

    #[error("Tenant '{0}' is not active or does not exist")]
    TenantNotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Active tenant row from the system database
#[derive(Debug, Clone, FromRow)]
pub struct TenantRecord {
    pub id: Uuid,
    pub name: String,
    pub database: String,
}

/// Connection pool cache for the system database and every tenant database.
/// Built once at startup and shared through `AppState`.
pub struct DatabaseManager {
    config: DatabaseConfig,
    transactional_imports: bool,
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl DatabaseManager {
    /// Name of the system database holding the `tenants` registry
    pub const SYSTEM_DB_NAME: &'static str = "backoffice_main";

    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            transactional_imports: true,
            pools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether repositories handed out by this manager apply imports in one transaction
    pub fn with_transactional_imports(mut self, transactional: bool) -> Self {
        self.transactional_imports = transactional;
        self
    }

    /// Get main system database pool
    pub async fn main_pool(&self) -> Result<PgPool, DatabaseError> {
        self.get_pool(Self::SYSTEM_DB_NAME).await
    }

    /// Get tenant database pool (validated name)
    pub async fn tenant_pool(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        if !Self::is_valid_db_name(database_name) {
            return Err(DatabaseError::InvalidTenantName(database_name.to_string()));
        }
        self.get_pool(database_name).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, database_name: &str) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(database_name) {
                return Ok(pool.clone());
            }
        }

        let connection_string = self.build_connection_string(database_name)?;

        let mut pools = self.pools.write().await;
        // Another request may have connected while we waited for the write lock
        if let Some(pool) = pools.get(database_name) {
            return Ok(pool.clone());
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.connection_timeout))
            .connect(&connection_string)
            .await?;
        pools.insert(database_name.to_string(), pool.clone());

        info!("Created database pool for: {}", database_name);
        Ok(pool)
    }

    /// Build connection string by swapping the database name into the configured URL path
    fn build_connection_string(&self, database_name: &str) -> Result<String, DatabaseError> {
        let base = self
            .config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    /// Look up an active, non-deleted tenant by its database name
    pub async fn find_active_tenant(&self, database_name: &str) -> Result<Option<TenantRecord>, DatabaseError> {
        let pool = self.main_pool().await?;
        let tenant = sqlx::query_as::<_, TenantRecord>(
            r#"
            SELECT id, name, database
            FROM tenants
            WHERE database = $1
            AND is_active = true
            AND trashed_at IS NULL
            AND deleted_at IS NULL
            "#,
        )
        .bind(database_name)
        .fetch_optional(&pool)
        .await?;
        Ok(tenant)
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", name);
        }
    }

    /// Validate database names to prevent injection. Accepts:
    /// - exact "backoffice_main"
    /// - names starting with "tenant_" followed by [a-zA-Z0-9_]+
    fn is_valid_db_name(name: &str) -> bool {
        if name == Self::SYSTEM_DB_NAME {
            return true;
        }
        match name.strip_prefix("tenant_") {
            Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            None => false,
        }
    }
}

#[async_trait]
impl TenantDirectory for DatabaseManager {
    async fn degrees(&self, database: &str) -> Result<Arc<dyn DegreeRepository>, DatabaseError> {
        if !Self::is_valid_db_name(database) || database == Self::SYSTEM_DB_NAME {
            return Err(DatabaseError::InvalidTenantName(database.to_string()));
        }

        let tenant = self.find_active_tenant(database).await?.ok_or_else(|| {
            tracing::warn!("Tenant validation failed: tenant '{}' not found or inactive", database);
            DatabaseError::TenantNotFound(database.to_string())
        })?;
        tracing::debug!("Tenant validation successful: {} ({})", tenant.name, tenant.database);

        let pool = self.tenant_pool(&tenant.database).await?;
        Ok(Arc::new(
            PgDegreeRepository::new(pool).with_transactions(self.transactional_imports),
        ))
    }

    /// Pings the main pool to ensure connectivity
    async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.main_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}
