//! Bulk import reconciliation for degrees.
//!
//! An upload is merged into the rows already stored for a tenant according
//! to one of three methods:
//!
//! - `RESET` clears the store, then inserts the whole upload.
//! - `UPDATE` overwrites rows whose name already exists and inserts the rest.
//! - `ADD_NEW_ONLY` inserts only rows whose name is new.
//!
//! Planning is pure ([`ImportPlan::build`]); applying a plan goes through a
//! [`DegreeRepository`], which may make the whole plan atomic.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::database::models::{Degree, DegreeInput};
use crate::database::repository::{DegreeRepository, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMethod {
    Reset,
    Update,
    AddNewOnly,
}

impl ImportMethod {
    /// Parse the wire value. Anything other than the three known names
    /// (including null) yields `None`.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value? {
            "RESET" => Some(ImportMethod::Reset),
            "UPDATE" => Some(ImportMethod::Update),
            "ADD_NEW_ONLY" => Some(ImportMethod::AddNewOnly),
            _ => None,
        }
    }
}

/// Import request as submitted by callers
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default)]
    pub data_upload: Vec<DegreeInput>,
    pub import_method: Option<String>,
}

/// Store writes needed to reconcile one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub method: ImportMethod,
    /// Delete every existing row before inserting
    pub clear_existing: bool,
    /// Rows for a single bulk insert, in upload order
    pub inserts: Vec<DegreeInput>,
    /// Rows overwriting an existing row of the same name, in upload order
    pub updates: Vec<DegreeInput>,
}

impl ImportPlan {
    pub fn build(method: ImportMethod, existing: &[Degree], upload: Vec<DegreeInput>) -> Self {
        let mut plan = ImportPlan {
            method,
            clear_existing: false,
            inserts: Vec::new(),
            updates: Vec::new(),
        };
        if upload.is_empty() {
            return plan;
        }

        let existing_names: HashSet<&str> = existing.iter().map(|row| row.name.as_str()).collect();

        match method {
            ImportMethod::Reset => {
                plan.clear_existing = !existing.is_empty();
                plan.inserts = upload;
            }
            ImportMethod::Update => {
                let (updates, inserts) = upload
                    .into_iter()
                    .partition(|row| existing_names.contains(row.name.as_str()));
                plan.updates = updates;
                plan.inserts = inserts;
            }
            ImportMethod::AddNewOnly => {
                plan.inserts = upload
                    .into_iter()
                    .filter(|row| !existing_names.contains(row.name.as_str()))
                    .collect();
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.clear_existing && self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Row counts written by an applied plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub method: ImportMethod,
    pub deleted: u64,
    pub inserted: u64,
    pub updated: u64,
}

impl ImportSummary {
    pub fn new(method: ImportMethod) -> Self {
        Self {
            method,
            deleted: 0,
            inserted: 0,
            updated: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Applied(ImportSummary),
    /// The import method was missing or unrecognized; nothing was touched
    Skipped,
}

impl ImportOutcome {
    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            ImportOutcome::Applied(summary) => Some(summary),
            ImportOutcome::Skipped => None,
        }
    }
}

/// Apply `plan` step by step without a surrounding transaction: delete-all,
/// one bulk insert, then per-name updates with at most `fanout` in flight.
///
/// The first failing step's error is returned. Updates that already
/// completed stay applied.
pub async fn apply_plan<R>(repo: &R, plan: &ImportPlan, fanout: usize) -> Result<ImportSummary, StoreError>
where
    R: DegreeRepository + ?Sized,
{
    let mut summary = ImportSummary::new(plan.method);

    if plan.clear_existing {
        summary.deleted = repo.delete_many().await?.count;
    }
    if !plan.inserts.is_empty() {
        summary.inserted = repo.create_many(&plan.inserts).await?.count;
    }
    if !plan.updates.is_empty() {
        // Futures are built up front so the stream stays Send inside async-trait methods
        let pending: Vec<_> = plan.updates.iter().map(|row| repo.update_by_name(row)).collect();
        let updated: Vec<Degree> = stream::iter(pending)
            .buffer_unordered(fanout.max(1))
            .try_collect()
            .await?;
        summary.updated = updated.len() as u64;
    }

    Ok(summary)
}

/// Reconcile an upload against the rows currently in `repo`.
///
/// The existing rows are read fresh on every call. Nothing guards against a
/// concurrent writer between that read and the writes; callers that need
/// multi-writer safety must serialize imports themselves.
pub async fn run_import(
    repo: &dyn DegreeRepository,
    request: ImportRequest,
    fanout: usize,
) -> Result<ImportOutcome, StoreError> {
    let Some(method) = ImportMethod::parse(request.import_method.as_deref()) else {
        warn!(
            "Skipping degree import: unsupported import method {:?}",
            request.import_method
        );
        return Ok(ImportOutcome::Skipped);
    };

    let existing = repo.find_all().await?;
    let plan = ImportPlan::build(method, &existing, request.data_upload);
    if plan.is_empty() {
        info!("Degree import ({:?}) has nothing to write", method);
        return Ok(ImportOutcome::Applied(ImportSummary::new(method)));
    }

    let summary = repo.apply_import(&plan, fanout).await?;
    info!(
        "Degree import ({:?}): {} deleted, {} inserted, {} updated",
        method, summary.deleted, summary.inserted, summary.updated
    );
    Ok(ImportOutcome::Applied(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDegreeRepository;
    use crate::database::repository::{BulkResult, DegreeFilter, DegreeQuery};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn input(name: &str, description: &str) -> DegreeInput {
        DegreeInput::new(name, description)
    }

    fn request(method: Option<&str>, rows: Vec<DegreeInput>) -> ImportRequest {
        ImportRequest {
            data_upload: rows,
            import_method: method.map(str::to_string),
        }
    }

    async fn seeded() -> MemoryDegreeRepository {
        MemoryDegreeRepository::with_rows(&[input("A", "alpha"), input("B", "beta")]).await
    }

    async fn contents(repo: &MemoryDegreeRepository) -> Vec<(String, String)> {
        let mut rows: Vec<_> = repo
            .snapshot()
            .await
            .into_iter()
            .map(|row| (row.name, row.description))
            .collect();
        rows.sort();
        rows
    }

    fn pairs(rows: &[(&str, &str)]) -> Vec<(String, String)> {
        rows.iter().map(|(n, d)| (n.to_string(), d.to_string())).collect()
    }

    #[test]
    fn parses_known_methods_only() {
        assert_eq!(ImportMethod::parse(Some("RESET")), Some(ImportMethod::Reset));
        assert_eq!(ImportMethod::parse(Some("UPDATE")), Some(ImportMethod::Update));
        assert_eq!(ImportMethod::parse(Some("ADD_NEW_ONLY")), Some(ImportMethod::AddNewOnly));
        assert_eq!(ImportMethod::parse(Some("update")), None);
        assert_eq!(ImportMethod::parse(Some("")), None);
        assert_eq!(ImportMethod::parse(None), None);
    }

    #[test]
    fn update_plan_partitions_by_existing_name() {
        let existing = vec![input("A", "a"), input("B", "b")];
        let existing: Vec<Degree> = existing
            .into_iter()
            .map(|row| Degree {
                id: Uuid::new_v4(),
                name: row.name,
                description: row.description,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            })
            .collect();

        let plan = ImportPlan::build(
            ImportMethod::Update,
            &existing,
            vec![input("C", "c"), input("B", "b2"), input("D", "d"), input("B", "b3")],
        );

        assert!(!plan.clear_existing);
        assert_eq!(plan.inserts, vec![input("C", "c"), input("D", "d")]);
        assert_eq!(plan.updates, vec![input("B", "b2"), input("B", "b3")]);
    }

    #[test]
    fn reset_plan_skips_clear_when_store_is_empty() {
        let plan = ImportPlan::build(ImportMethod::Reset, &[], vec![input("A", "a")]);
        assert!(!plan.clear_existing);
        assert_eq!(plan.inserts, vec![input("A", "a")]);
    }

    #[test]
    fn empty_upload_plans_nothing_in_every_mode() {
        let existing = vec![Degree {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            description: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }];
        for method in [ImportMethod::Reset, ImportMethod::Update, ImportMethod::AddNewOnly] {
            assert!(ImportPlan::build(method, &existing, vec![]).is_empty(), "{:?}", method);
        }
    }

    #[tokio::test]
    async fn update_overwrites_existing_and_inserts_new() {
        let repo = seeded().await;

        let outcome = run_import(
            &repo,
            request(Some("UPDATE"), vec![input("B", "beta prime"), input("C", "gamma")]),
            4,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome.summary().copied(),
            Some(ImportSummary { method: ImportMethod::Update, deleted: 0, inserted: 1, updated: 1 })
        );
        assert_eq!(
            contents(&repo).await,
            pairs(&[("A", "alpha"), ("B", "beta prime"), ("C", "gamma")])
        );
    }

    #[tokio::test]
    async fn update_keeps_row_identity() {
        let repo = seeded().await;
        let before = repo.snapshot().await;

        run_import(&repo, request(Some("UPDATE"), vec![input("B", "changed")]), 4)
            .await
            .unwrap();

        let after = repo.snapshot().await;
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].id, before[1].id);
        assert_eq!(after[0], before[0]);
    }

    #[tokio::test]
    async fn add_new_only_leaves_collisions_untouched() {
        let repo = seeded().await;

        let outcome = run_import(
            &repo,
            request(Some("ADD_NEW_ONLY"), vec![input("B", "ignored"), input("C", "gamma")]),
            4,
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary().map(|s| (s.inserted, s.updated)), Some((1, 0)));
        assert_eq!(
            contents(&repo).await,
            pairs(&[("A", "alpha"), ("B", "beta"), ("C", "gamma")])
        );
    }

    #[tokio::test]
    async fn reset_replaces_everything() {
        let repo = seeded().await;

        let outcome = run_import(
            &repo,
            request(Some("RESET"), vec![input("C", "gamma"), input("D", "delta")]),
            4,
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary().map(|s| (s.deleted, s.inserted)), Some((2, 2)));
        assert_eq!(contents(&repo).await, pairs(&[("C", "gamma"), ("D", "delta")]));
    }

    #[tokio::test]
    async fn reset_keeps_first_of_repeated_names() {
        let repo = seeded().await;

        run_import(
            &repo,
            request(Some("RESET"), vec![input("A", "first"), input("A", "second"), input("B", "b")]),
            4,
        )
        .await
        .unwrap();

        assert_eq!(contents(&repo).await, pairs(&[("A", "first"), ("B", "b")]));
    }

    #[tokio::test]
    async fn empty_upload_is_a_no_op() {
        for method in ["RESET", "UPDATE", "ADD_NEW_ONLY"] {
            let repo = seeded().await;
            let before = repo.snapshot().await;

            let outcome = run_import(&repo, request(Some(method), vec![]), 4).await.unwrap();

            let summary = outcome.summary().copied().unwrap();
            assert_eq!((summary.deleted, summary.inserted, summary.updated), (0, 0, 0));
            assert_eq!(repo.snapshot().await, before, "{} mutated the store", method);
        }
    }

    #[tokio::test]
    async fn unrecognized_method_is_skipped() {
        for method in [None, Some("MERGE")] {
            let repo = seeded().await;
            let before = repo.snapshot().await;

            let outcome = run_import(&repo, request(method, vec![input("C", "gamma")]), 4)
                .await
                .unwrap();

            assert_eq!(outcome, ImportOutcome::Skipped);
            assert_eq!(repo.snapshot().await, before);
        }
    }

    /// Delegates to a memory store, failing updates for one name,
    /// counting write calls and recording how many updates overlap.
    struct InstrumentedRepo {
        inner: MemoryDegreeRepository,
        poisoned: Option<String>,
        writes: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InstrumentedRepo {
        async fn new(poisoned: Option<&str>) -> Self {
            Self {
                inner: seeded().await,
                poisoned: poisoned.map(str::to_string),
                writes: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DegreeRepository for InstrumentedRepo {
        async fn count(&self, filter: &DegreeFilter) -> Result<i64, StoreError> {
            self.inner.count(filter).await
        }
        async fn find_many(&self, query: &DegreeQuery) -> Result<Vec<Degree>, StoreError> {
            self.inner.find_many(query).await
        }
        async fn find_all(&self) -> Result<Vec<Degree>, StoreError> {
            self.inner.find_all().await
        }
        async fn find_unique(&self, id: Uuid) -> Result<Option<Degree>, StoreError> {
            self.inner.find_unique(id).await
        }
        async fn create(&self, input: DegreeInput) -> Result<Degree, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.create(input).await
        }
        async fn create_many(&self, inputs: &[DegreeInput]) -> Result<BulkResult, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.create_many(inputs).await
        }
        async fn update(&self, id: Uuid, input: DegreeInput) -> Result<Degree, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(id, input).await
        }
        async fn update_by_name(&self, input: &DegreeInput) -> Result<Degree, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.poisoned.as_deref() == Some(input.name.as_str()) {
                return Err(StoreError::NotFound(format!("degree '{}' not found", input.name)));
            }
            self.inner.update_by_name(input).await
        }
        async fn delete(&self, id: Uuid) -> Result<Degree, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }
        async fn delete_many(&self) -> Result<BulkResult, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_many().await
        }
    }

    #[tokio::test]
    async fn updates_never_exceed_fanout() {
        let repo = InstrumentedRepo::new(None).await;
        let upload: Vec<_> = (0..12).map(|i| input(if i % 2 == 0 { "A" } else { "B" }, "x")).collect();

        let plan = ImportPlan::build(ImportMethod::Update, &repo.find_all().await.unwrap(), upload);
        let summary = apply_plan(&repo, &plan, 3).await.unwrap();

        assert_eq!(summary.updated, 12);
        let peak = repo.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded fanout", peak);
        assert!(peak >= 2, "updates were not run concurrently");
    }

    #[tokio::test]
    async fn zero_fanout_still_makes_progress() {
        let repo = InstrumentedRepo::new(None).await;
        let plan = ImportPlan::build(ImportMethod::Update, &repo.find_all().await.unwrap(), vec![input("A", "x")]);
        assert_eq!(apply_plan(&repo, &plan, 0).await.unwrap().updated, 1);
    }

    #[tokio::test]
    async fn update_failure_propagates_after_inserts() {
        let repo = InstrumentedRepo::new(Some("B")).await;

        let err = run_import(
            &repo,
            request(Some("UPDATE"), vec![input("B", "beta prime"), input("C", "gamma")]),
            2,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        // Without a transaction the bulk insert stays applied
        let names: Vec<_> = repo.inner.snapshot().await.into_iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn add_new_only_with_only_collisions_writes_nothing() {
        let repo = InstrumentedRepo::new(None).await;

        let outcome = run_import(
            &repo,
            request(Some("ADD_NEW_ONLY"), vec![input("A", "other"), input("B", "other")]),
            4,
        )
        .await
        .unwrap();

        assert_eq!(outcome.summary().map(|s| s.inserted), Some(0));
        assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
        assert_eq!(
            contents(&repo.inner).await,
            pairs(&[("A", "alpha"), ("B", "beta")])
        );
    }

    #[tokio::test]
    async fn unrecognized_method_writes_nothing() {
        let repo = InstrumentedRepo::new(None).await;
        run_import(&repo, request(Some("APPEND"), vec![input("C", "gamma")]), 4)
            .await
            .unwrap();
        assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
    }
}
