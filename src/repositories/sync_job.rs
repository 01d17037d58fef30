//! # SyncJob Repository
//!
//! Repository operations for the sync_jobs table: idempotent creation,
//! state-machine-enforced status transitions, and progress-field merging.
//! The ledger never deletes jobs; retention is an external concern.

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::idempotency;
use crate::models::sync_error;
use crate::models::sync_job::{
    ActiveModel, Column, Entity, EntityTypeSet, Model, SyncEntityType, SyncJobStatus, SyncSource,
};

/// Partial counter update applied to a running job.
///
/// Merge semantics: omitted fields keep their stored value, supplied fields
/// replace it. Values are absolute, not deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressUpdate {
    pub total_records: Option<i32>,
    pub processed_records: Option<i32>,
    pub created_records: Option<i32>,
    pub updated_records: Option<i32>,
    pub error_records: Option<i32>,
}

/// Repository for sync job database operations
pub struct SyncJobRepository {
    db: DatabaseConnection,
}

impl SyncJobRepository {
    /// Create a new SyncJobRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a sync job, suppressing duplicates of an outstanding sync intent.
    ///
    /// The idempotency key is either validated (caller-supplied) or derived
    /// from (owner, source, entity types, today). An existing non-terminal
    /// job under the key is returned unchanged; a terminal one releases the
    /// key for history and the new job is created under a suffixed key.
    pub async fn create(
        &self,
        owner_id: &str,
        source: SyncSource,
        entity_types: &[SyncEntityType],
        idempotency_key: Option<&str>,
        total_records: Option<i32>,
    ) -> Result<Model, LedgerError> {
        let entity_types = EntityTypeSet::normalized(entity_types);
        if entity_types.is_empty() {
            return Err(LedgerError::EmptyEntityTypes);
        }

        let now = Utc::now();
        let key = match idempotency_key {
            Some(key) => {
                idempotency::validate_key(key)?;
                key.to_string()
            }
            None => idempotency::derive_key(owner_id, source, &entity_types, now.date_naive()),
        };

        let key = match self.find_by_key(&key).await? {
            Some(existing) if !existing.status.is_terminal() => {
                tracing::info!(
                    owner_id = %owner_id,
                    job_id = %existing.id,
                    idempotency_key = %key,
                    "Duplicate sync job request suppressed, returning outstanding job"
                );
                return Ok(existing);
            }
            // The key was consumed by a finished run; rerun under a fresh key.
            Some(_) => idempotency::with_timestamp_suffix(&key, now),
            None => key,
        };

        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id.to_string()),
            source: Set(source),
            entity_types: Set(entity_types),
            status: Set(SyncJobStatus::Pending),
            idempotency_key: Set(key),
            total_records: Set(total_records.unwrap_or(0)),
            processed_records: Set(0),
            created_records: Set(0),
            updated_records: Set(0),
            error_records: Set(0),
            started_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now.fixed_offset()),
            updated_at: Set(now.fixed_offset()),
        };

        let job = job.insert(&self.db).await?;

        tracing::info!(
            owner_id = %job.owner_id,
            job_id = %job.id,
            source = %job.source,
            idempotency_key = %job.idempotency_key,
            "Sync job created"
        );

        Ok(job)
    }

    /// Transition a pending job to running, stamping `started_at`.
    pub async fn start(&self, job_id: Uuid) -> Result<Model, LedgerError> {
        let job = self.load(job_id).await?;
        Self::ensure_transition(&job, SyncJobStatus::Running)?;

        let now = Utc::now().fixed_offset();
        let mut active: ActiveModel = job.into();
        active.status = Set(SyncJobStatus::Running);
        active.started_at = Set(Some(now));
        active.updated_at = Set(now);

        let job = active.update(&self.db).await?;
        tracing::info!(job_id = %job.id, "Sync job started");
        Ok(job)
    }

    /// Merge progress counters into a running job.
    pub async fn update_progress(
        &self,
        job_id: Uuid,
        progress: ProgressUpdate,
    ) -> Result<Model, LedgerError> {
        let job = self.load(job_id).await?;
        Self::ensure_running(&job)?;

        let mut active: ActiveModel = job.into();
        Self::apply_progress(&mut active, progress);
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&self.db).await?)
    }

    /// Transition a running job to completed, merging any final counters.
    pub async fn complete(
        &self,
        job_id: Uuid,
        final_progress: Option<ProgressUpdate>,
    ) -> Result<Model, LedgerError> {
        let job = self.load(job_id).await?;
        Self::ensure_transition(&job, SyncJobStatus::Completed)?;

        let now = Utc::now().fixed_offset();
        let mut active: ActiveModel = job.into();
        active.status = Set(SyncJobStatus::Completed);
        active.completed_at = Set(Some(now));
        active.updated_at = Set(now);
        if let Some(progress) = final_progress {
            Self::apply_progress(&mut active, progress);
        }

        let job = active.update(&self.db).await?;
        tracing::info!(
            job_id = %job.id,
            processed_records = job.processed_records,
            error_records = job.error_records,
            "Sync job completed"
        );
        Ok(job)
    }

    /// Transition a pending or running job to failed.
    ///
    /// A supplied reason is first recorded as a job-level sync error so that
    /// triage tooling sees whole-job failures alongside per-record ones.
    pub async fn fail(&self, job_id: Uuid, reason: Option<&str>) -> Result<Model, LedgerError> {
        let job = self.load(job_id).await?;
        Self::ensure_transition(&job, SyncJobStatus::Failed)?;

        let now = Utc::now().fixed_offset();

        if let Some(reason) = reason {
            let error = sync_error::ActiveModel {
                id: Set(Uuid::new_v4()),
                sync_job_id: Set(job.id),
                entity_type: Set("job".to_string()),
                external_id: Set(job.id.to_string()),
                error_type: Set(sync_error::SyncErrorType::Unknown),
                error_message: Set(reason.to_string()),
                raw_data: Set(None),
                resolved: Set(false),
                resolved_at: Set(None),
                resolved_by: Set(None),
                resolution: Set(None),
                created_at: Set(now),
            };
            error.insert(&self.db).await?;

            Entity::update_many()
                .col_expr(
                    Column::ErrorRecords,
                    Expr::value(Expr::col(Column::ErrorRecords).add(1)),
                )
                .filter(Column::Id.eq(job.id))
                .exec(&self.db)
                .await?;
        }

        let mut active: ActiveModel = job.into();
        active.status = Set(SyncJobStatus::Failed);
        active.completed_at = Set(Some(now));
        active.updated_at = Set(now);

        let job = active.update(&self.db).await?;
        tracing::warn!(job_id = %job.id, reason = reason.unwrap_or("none"), "Sync job failed");
        Ok(job)
    }

    /// Transition a pending or running job to cancelled.
    ///
    /// Logical only: in-flight work is not signalled. A worker that keeps
    /// reporting progress afterwards gets `InvalidStatusTransition`.
    pub async fn cancel(&self, job_id: Uuid) -> Result<Model, LedgerError> {
        let job = self.load(job_id).await?;
        Self::ensure_transition(&job, SyncJobStatus::Cancelled)?;

        let now = Utc::now().fixed_offset();
        let mut active: ActiveModel = job.into();
        active.status = Set(SyncJobStatus::Cancelled);
        active.completed_at = Set(Some(now));
        active.updated_at = Set(now);

        let job = active.update(&self.db).await?;
        tracing::info!(job_id = %job.id, "Sync job cancelled");
        Ok(job)
    }

    /// Fetch a job by id.
    pub async fn get(&self, job_id: Uuid) -> Result<Model, LedgerError> {
        self.load(job_id).await
    }

    /// Fetch a job by its exact idempotency key.
    pub async fn get_by_key(&self, key: &str) -> Result<Model, LedgerError> {
        self.find_by_key(key)
            .await?
            .ok_or_else(|| LedgerError::SyncJobNotFound(key.to_string()))
    }

    /// List an owner's jobs, newest first, optionally filtered to a status set.
    pub async fn list_for_owner(
        &self,
        owner_id: &str,
        statuses: Option<&[SyncJobStatus]>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Model>, LedgerError> {
        let mut query = Entity::find()
            .filter(Column::OwnerId.eq(owner_id))
            .order_by_desc(Column::CreatedAt);

        if let Some(statuses) = statuses {
            query = query.filter(Column::Status.is_in(statuses.iter().copied()));
        }

        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }

        Ok(query.all(&self.db).await?)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Model>, LedgerError> {
        Ok(Entity::find()
            .filter(Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await?)
    }

    async fn load(&self, job_id: Uuid) -> Result<Model, LedgerError> {
        Entity::find_by_id(job_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::job_not_found(job_id))
    }

    fn ensure_transition(job: &Model, to: SyncJobStatus) -> Result<(), LedgerError> {
        if job.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(LedgerError::InvalidStatusTransition {
                from: job.status,
                to,
            })
        }
    }

    fn ensure_running(job: &Model) -> Result<(), LedgerError> {
        if job.status == SyncJobStatus::Running {
            Ok(())
        } else {
            Err(LedgerError::InvalidStatusTransition {
                from: job.status,
                to: SyncJobStatus::Running,
            })
        }
    }

    fn apply_progress(active: &mut ActiveModel, progress: ProgressUpdate) {
        if let Some(total) = progress.total_records {
            active.total_records = Set(total);
        }
        if let Some(processed) = progress.processed_records {
            active.processed_records = Set(processed);
        }
        if let Some(created) = progress.created_records {
            active.created_records = Set(created);
        }
        if let Some(updated) = progress.updated_records {
            active.updated_records = Set(updated);
        }
        if let Some(errors) = progress.error_records {
            active.error_records = Set(errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to test DB");
        Migrator::up(&db, None).await.expect("Migrations failed");
        db
    }

    fn repo(db: &DatabaseConnection) -> SyncJobRepository {
        SyncJobRepository::new(db.clone())
    }

    #[tokio::test]
    async fn create_starts_pending_with_zeroed_counters() {
        let db = setup_db().await;
        let job = repo(&db)
            .create(
                "d1",
                SyncSource::Sis,
                &[SyncEntityType::Users, SyncEntityType::Classes],
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(job.status, SyncJobStatus::Pending);
        assert_eq!(job.total_records, 0);
        assert_eq!(job.processed_records, 0);
        assert_eq!(job.error_records, 0);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.idempotency_key.starts_with("sync-d1-"));
    }

    #[tokio::test]
    async fn create_is_idempotent_while_job_is_outstanding() {
        let db = setup_db().await;
        let repo = repo(&db);

        let first = repo
            .create(
                "d1",
                SyncSource::Sis,
                &[SyncEntityType::Users, SyncEntityType::Classes],
                None,
                None,
            )
            .await
            .unwrap();
        // Same logical intent, different entity-type order on the wire.
        let second = repo
            .create(
                "d1",
                SyncSource::Sis,
                &[SyncEntityType::Classes, SyncEntityType::Users],
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.idempotency_key, second.idempotency_key);
    }

    #[tokio::test]
    async fn create_after_terminal_job_suffixes_the_key() {
        let db = setup_db().await;
        let repo = repo(&db);

        let first = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        repo.start(first.id).await.unwrap();
        repo.complete(first.id, None).await.unwrap();

        let second = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.status, SyncJobStatus::Pending);
        assert!(
            second
                .idempotency_key
                .starts_with(&format!("{}-", first.idempotency_key)),
            "expected suffixed key, got {}",
            second.idempotency_key
        );
    }

    #[tokio::test]
    async fn create_accepts_valid_custom_key_and_rejects_invalid() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create(
                "d1",
                SyncSource::Manual,
                &[SyncEntityType::Users],
                Some("district-1-backfill"),
                Some(500),
            )
            .await
            .unwrap();
        assert_eq!(job.idempotency_key, "district-1-backfill");
        assert_eq!(job.total_records, 500);

        let err = repo
            .create(
                "d1",
                SyncSource::Manual,
                &[SyncEntityType::Users],
                Some("a"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidIdempotencyKey { .. }));
    }

    #[tokio::test]
    async fn create_rejects_empty_entity_types() {
        let db = setup_db().await;
        let err = repo(&db)
            .create("d1", SyncSource::Sis, &[], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EmptyEntityTypes));
    }

    #[tokio::test]
    async fn start_succeeds_once_and_stamps_started_at() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        let started = repo.start(job.id).await.unwrap();
        assert_eq!(started.status, SyncJobStatus::Running);
        assert!(started.started_at.is_some());

        let err = repo.start(job.id).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidStatusTransition {
                from: SyncJobStatus::Running,
                to: SyncJobStatus::Running,
            }
        ));
    }

    #[tokio::test]
    async fn update_progress_merges_without_zeroing_omitted_fields() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        repo.start(job.id).await.unwrap();

        repo.update_progress(
            job.id,
            ProgressUpdate {
                total_records: Some(200),
                processed_records: Some(50),
                created_records: Some(30),
                updated_records: Some(20),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let merged = repo
            .update_progress(
                job.id,
                ProgressUpdate {
                    processed_records: Some(120),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.total_records, 200);
        assert_eq!(merged.processed_records, 120);
        assert_eq!(merged.created_records, 30);
        assert_eq!(merged.updated_records, 20);
        assert_eq!(merged.error_records, 0);
        assert_eq!(merged.status, SyncJobStatus::Running);
    }

    #[tokio::test]
    async fn update_progress_requires_running() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();

        let err = repo
            .update_progress(job.id, ProgressUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn complete_sets_completed_at_and_merges_final_counters() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        repo.start(job.id).await.unwrap();

        let done = repo
            .complete(
                job.id,
                Some(ProgressUpdate {
                    processed_records: Some(99),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        assert_eq!(done.status, SyncJobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.processed_records, 99);

        // Terminal: any further transition is rejected.
        let err = repo.cancel(job.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn complete_requires_running() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();

        let err = repo.complete(job.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidStatusTransition {
                from: SyncJobStatus::Pending,
                to: SyncJobStatus::Completed,
            }
        ));
    }

    #[tokio::test]
    async fn fail_with_reason_records_job_level_error() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::VendorApi, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        repo.start(job.id).await.unwrap();

        let failed = repo.fail(job.id, Some("upstream timed out")).await.unwrap();
        assert_eq!(failed.status, SyncJobStatus::Failed);
        assert!(failed.completed_at.is_some());
        assert_eq!(failed.error_records, 1);

        let errors = sync_error::Entity::find()
            .filter(sync_error::Column::SyncJobId.eq(job.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entity_type, "job");
        assert_eq!(errors[0].external_id, job.id.to_string());
        assert_eq!(errors[0].error_type, sync_error::SyncErrorType::Unknown);
        assert_eq!(errors[0].error_message, "upstream timed out");
    }

    #[tokio::test]
    async fn fail_is_permitted_from_pending_without_reason() {
        let db = setup_db().await;
        let repo = repo(&db);

        let job = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        let failed = repo.fail(job.id, None).await.unwrap();

        assert_eq!(failed.status, SyncJobStatus::Failed);
        assert_eq!(failed.error_records, 0);
        assert!(failed.started_at.is_none());
        assert!(failed.completed_at.is_some());
    }

    #[tokio::test]
    async fn cancel_is_permitted_from_pending_and_running() {
        let db = setup_db().await;
        let repo = repo(&db);

        let pending = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        let cancelled = repo.cancel(pending.id).await.unwrap();
        assert_eq!(cancelled.status, SyncJobStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        let running = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Classes], None, None)
            .await
            .unwrap();
        repo.start(running.id).await.unwrap();
        let cancelled = repo.cancel(running.id).await.unwrap();
        assert_eq!(cancelled.status, SyncJobStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_job_id_yields_not_found() {
        let db = setup_db().await;
        let repo = repo(&db);

        let err = repo.start(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LedgerError::SyncJobNotFound(_)));

        let err = repo.get_by_key("sync-d1-2025-01-01-sis-ab12cd34").await.unwrap_err();
        assert!(matches!(err, LedgerError::SyncJobNotFound(_)));
    }

    #[tokio::test]
    async fn list_for_owner_is_newest_first_with_status_filter() {
        let db = setup_db().await;
        let repo = repo(&db);

        let a = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        // Spread creation timestamps so the ordering is observable.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = repo
            .create("d1", SyncSource::Sis, &[SyncEntityType::Classes], None, None)
            .await
            .unwrap();
        repo.create("d2", SyncSource::Sis, &[SyncEntityType::Users], None, None)
            .await
            .unwrap();
        repo.start(b.id).await.unwrap();

        let all = repo.list_for_owner("d1", None, None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b.id);
        assert_eq!(all[1].id, a.id);

        let running = repo
            .list_for_owner("d1", Some(&[SyncJobStatus::Running]), None, None)
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, b.id);

        let either = repo
            .list_for_owner(
                "d1",
                Some(&[SyncJobStatus::Pending, SyncJobStatus::Running]),
                Some(1),
                None,
            )
            .await
            .unwrap();
        assert_eq!(either.len(), 1);
    }
}
