use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::models::{Degree, DegreeInput};
use crate::database::repository::{BulkResult, DegreeFilter, DegreeQuery, DegreeRepository, StoreError};

/// In-process degree store. Rows are kept in insertion order; each operation
/// is atomic on its own but there are no multi-operation transactions.
#[derive(Debug, Default)]
pub struct MemoryDegreeRepository {
    rows: Mutex<Vec<Degree>>,
}

impl MemoryDegreeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, applying the same skip-duplicates rule as `create_many`
    pub async fn with_rows(inputs: &[DegreeInput]) -> Self {
        let repo = Self::new();
        repo.insert_skipping_duplicates(inputs).await;
        repo
    }

    /// Snapshot of every row, in insertion order
    pub async fn snapshot(&self) -> Vec<Degree> {
        self.rows.lock().await.clone()
    }

    async fn insert_skipping_duplicates(&self, inputs: &[DegreeInput]) -> u64 {
        let mut rows = self.rows.lock().await;
        let mut names: HashSet<String> = rows.iter().map(|row| row.name.clone()).collect();
        let mut inserted = 0;
        for input in inputs {
            if !names.insert(input.name.clone()) {
                continue;
            }
            rows.push(new_row(input.clone()));
            inserted += 1;
        }
        inserted
    }
}

fn new_row(input: DegreeInput) -> Degree {
    let now = Utc::now();
    Degree {
        id: Uuid::new_v4(),
        name: input.name,
        description: input.description,
        created_at: now,
        updated_at: now,
    }
}

fn name_taken(name: &str) -> StoreError {
    StoreError::Conflict(format!("degree '{}' already exists", name))
}

#[async_trait]
impl DegreeRepository for MemoryDegreeRepository {
    async fn count(&self, filter: &DegreeFilter) -> Result<i64, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().filter(|row| filter.matches(row)).count() as i64)
    }

    async fn find_many(&self, query: &DegreeQuery) -> Result<Vec<Degree>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| query.filter.matches(row))
            .skip(usize::try_from(query.skip()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.take()).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Degree>, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn find_unique(&self, id: Uuid) -> Result<Option<Degree>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn create(&self, input: DegreeInput) -> Result<Degree, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.name == input.name) {
            return Err(name_taken(&input.name));
        }
        let row = new_row(input);
        rows.push(row.clone());
        Ok(row)
    }

    async fn create_many(&self, inputs: &[DegreeInput]) -> Result<BulkResult, StoreError> {
        Ok(BulkResult::new(self.insert_skipping_duplicates(inputs).await))
    }

    async fn update(&self, id: Uuid, input: DegreeInput) -> Result<Degree, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|row| row.id != id && row.name == input.name) {
            return Err(name_taken(&input.name));
        }
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("degree {} not found", id)))?;
        row.name = input.name;
        row.description = input.description;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update_by_name(&self, input: &DegreeInput) -> Result<Degree, StoreError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.name == input.name)
            .ok_or_else(|| StoreError::NotFound(format!("degree '{}' not found", input.name)))?;
        row.description = input.description.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Degree, StoreError> {
        let mut rows = self.rows.lock().await;
        let index = rows
            .iter()
            .position(|row| row.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("degree {} not found", id)))?;
        Ok(rows.remove(index))
    }

    async fn delete_many(&self) -> Result<BulkResult, StoreError> {
        let mut rows = self.rows.lock().await;
        let count = rows.len() as u64;
        rows.clear();
        Ok(BulkResult::new(count))
    }
}
