use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::memory::MemoryDegreeRepository;
use crate::database::repository::DegreeRepository;

/// Resolves the tenant database named in a token into a degree store
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn degrees(&self, database: &str) -> Result<Arc<dyn DegreeRepository>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Tenant directory over in-memory stores, one per registered database name
#[derive(Default)]
pub struct MemoryTenants {
    tenants: RwLock<HashMap<String, Arc<MemoryDegreeRepository>>>,
}

impl MemoryTenants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or fetch) the store for `database`
    pub async fn register(&self, database: &str) -> Arc<MemoryDegreeRepository> {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(database.to_string())
            .or_insert_with(|| Arc::new(MemoryDegreeRepository::new()))
            .clone()
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenants {
    async fn degrees(&self, database: &str) -> Result<Arc<dyn DegreeRepository>, DatabaseError> {
        let tenants = self.tenants.read().await;
        match tenants.get(database) {
            Some(repo) => Ok(repo.clone()),
            None => Err(DatabaseError::TenantNotFound(database.to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
