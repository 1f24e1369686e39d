use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{Degree, DegreeInput};
use crate::database::repository::{BulkResult, DegreeFilter, DegreeQuery, DegreeRepository, StoreError};
use crate::import::{apply_plan, ImportPlan, ImportSummary};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Degree store backed by a tenant's PostgreSQL database (`degrees` table)
#[derive(Clone)]
pub struct PgDegreeRepository {
    pool: PgPool,
    transactional: bool,
}

impl PgDegreeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            transactional: true,
        }
    }

    /// Toggle the single-transaction import path
    pub fn with_transactions(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }
}

/// `ILIKE` pattern for a search key, with LIKE metacharacters escaped
fn like_pattern(filter: &DegreeFilter) -> Option<String> {
    filter.search_key.as_ref().map(|key| {
        let escaped = key.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

async fn insert_many<'e, E>(executor: E, inputs: &[DegreeInput]) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if inputs.is_empty() {
        return Ok(0);
    }
    let names: Vec<String> = inputs.iter().map(|row| row.name.clone()).collect();
    let descriptions: Vec<String> = inputs.iter().map(|row| row.description.clone()).collect();

    // WITH ORDINALITY keeps upload order so the first of any repeated name wins
    let result = sqlx::query(
        r#"
        INSERT INTO degrees (name, description)
        SELECT name, description
        FROM UNNEST($1::text[], $2::text[]) WITH ORDINALITY AS t(name, description, ord)
        ORDER BY ord
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(names)
    .bind(descriptions)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

async fn update_by_name_with<'e, E>(executor: E, input: &DegreeInput) -> Result<Degree, StoreError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE degrees SET description = $2, updated_at = now() WHERE name = $1 RETURNING {}",
        COLUMNS
    );
    sqlx::query_as::<_, Degree>(&sql)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("degree '{}' not found", input.name)))
}

#[async_trait]
impl DegreeRepository for PgDegreeRepository {
    async fn count(&self, filter: &DegreeFilter) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM degrees WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(like_pattern(filter))
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn find_many(&self, query: &DegreeQuery) -> Result<Vec<Degree>, StoreError> {
        let sql = format!(
            "SELECT {} FROM degrees WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY created_at, id OFFSET $2 LIMIT $3",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, Degree>(&sql)
            .bind(like_pattern(&query.filter))
            .bind(query.skip())
            .bind(query.take())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_all(&self) -> Result<Vec<Degree>, StoreError> {
        let sql = format!("SELECT {} FROM degrees ORDER BY created_at, id", COLUMNS);
        let rows = sqlx::query_as::<_, Degree>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_unique(&self, id: Uuid) -> Result<Option<Degree>, StoreError> {
        let sql = format!("SELECT {} FROM degrees WHERE id = $1", COLUMNS);
        let row = sqlx::query_as::<_, Degree>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(&self, input: DegreeInput) -> Result<Degree, StoreError> {
        let sql = format!(
            "INSERT INTO degrees (name, description) VALUES ($1, $2) RETURNING {}",
            COLUMNS
        );
        let row = sqlx::query_as::<_, Degree>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_many(&self, inputs: &[DegreeInput]) -> Result<BulkResult, StoreError> {
        Ok(BulkResult::new(insert_many(&self.pool, inputs).await?))
    }

    async fn update(&self, id: Uuid, input: DegreeInput) -> Result<Degree, StoreError> {
        let sql = format!(
            "UPDATE degrees SET name = $2, description = $3, updated_at = now() WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, Degree>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("degree {} not found", id)))
    }

    async fn update_by_name(&self, input: &DegreeInput) -> Result<Degree, StoreError> {
        update_by_name_with(&self.pool, input).await
    }

    async fn delete(&self, id: Uuid) -> Result<Degree, StoreError> {
        let sql = format!("DELETE FROM degrees WHERE id = $1 RETURNING {}", COLUMNS);
        sqlx::query_as::<_, Degree>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("degree {} not found", id)))
    }

    async fn delete_many(&self) -> Result<BulkResult, StoreError> {
        let result = sqlx::query("DELETE FROM degrees").execute(&self.pool).await?;
        Ok(BulkResult::new(result.rows_affected()))
    }

    async fn apply_import(&self, plan: &ImportPlan, fanout: usize) -> Result<ImportSummary, StoreError> {
        if !self.transactional {
            return apply_plan(self, plan, fanout).await;
        }

        // One connection per transaction, so updates run one after another here.
        // Dropping `tx` on any early return rolls the whole import back.
        let mut tx = self.pool.begin().await?;
        let mut summary = ImportSummary::new(plan.method);

        if plan.clear_existing {
            summary.deleted = sqlx::query("DELETE FROM degrees").execute(&mut *tx).await?.rows_affected();
        }
        summary.inserted = insert_many(&mut *tx, &plan.inserts).await?;
        for row in &plan.updates {
            update_by_name_with(&mut *tx, row).await?;
            summary.updated += 1;
        }

        tx.commit().await?;
        debug!(
            "Committed {:?} import: {} deleted, {} inserted, {} updated",
            plan.method, summary.deleted, summary.inserted, summary.updated
        );
        Ok(summary)
    }
}
