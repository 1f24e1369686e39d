use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Degree, DegreeInput};
use crate::import::{apply_plan, ImportPlan, ImportSummary};

/// Errors surfaced by a degree store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

/// Result of a bulk write: number of rows actually affected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub count: u64,
}

impl BulkResult {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

/// Name filter shared by `count` and `find_many`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeFilter {
    /// Case-insensitive substring match on `name`
    pub search_key: Option<String>,
}

impl DegreeFilter {
    pub fn search(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            search_key: if key.is_empty() { None } else { Some(key) },
        }
    }

    pub fn matches(&self, degree: &Degree) -> bool {
        match &self.search_key {
            Some(key) => degree.name.to_lowercase().contains(&key.to_lowercase()),
            None => true,
        }
    }
}

/// One page of a filtered listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeQuery {
    pub filter: DegreeFilter,
    pub page_index: i64,
    pub page_size: i64,
}

impl DegreeQuery {
    /// Rows before the page; saturates instead of overflowing on huge indexes
    pub fn skip(&self) -> i64 {
        self.page_index.max(0).saturating_mul(self.page_size.max(0))
    }

    pub fn take(&self) -> i64 {
        self.page_size.max(0)
    }
}

/// Persistence collaborator for degrees.
///
/// Bulk inserts skip rows whose name already exists, including names
/// repeated earlier in the same batch; single-row writes report a
/// [`StoreError::Conflict`] instead.
#[async_trait]
pub trait DegreeRepository: Send + Sync {
    async fn count(&self, filter: &DegreeFilter) -> Result<i64, StoreError>;

    /// Rows ordered by creation, paged by `query`
    async fn find_many(&self, query: &DegreeQuery) -> Result<Vec<Degree>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Degree>, StoreError>;

    async fn find_unique(&self, id: Uuid) -> Result<Option<Degree>, StoreError>;

    async fn create(&self, input: DegreeInput) -> Result<Degree, StoreError>;

    async fn create_many(&self, inputs: &[DegreeInput]) -> Result<BulkResult, StoreError>;

    async fn update(&self, id: Uuid, input: DegreeInput) -> Result<Degree, StoreError>;

    /// Overwrite the fields of the row whose name equals `input.name`
    async fn update_by_name(&self, input: &DegreeInput) -> Result<Degree, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Degree, StoreError>;

    async fn delete_many(&self) -> Result<BulkResult, StoreError>;

    /// Apply an import plan. Stores with transactions override this to make
    /// the whole plan atomic; the default applies each step independently.
    async fn apply_import(&self, plan: &ImportPlan, fanout: usize) -> Result<ImportSummary, StoreError> {
        apply_plan(self, plan, fanout).await
    }
}
