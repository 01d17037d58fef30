//! # SyncError Repository
//!
//! Append-only error recording with triage listings and a resolution
//! workflow. Recording stays permitted after the owning job reaches a
//! terminal status, so late-discovered failures are still captured.

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::sync_error::{
    ActiveModel, Column, Entity, ErrorResolution, Model, SyncErrorType,
};
use crate::models::sync_job;

/// Repository for sync error database operations
pub struct SyncErrorRepository {
    db: DatabaseConnection,
}

impl SyncErrorRepository {
    /// Create a new SyncErrorRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record one per-record failure against an existing job.
    ///
    /// Inserts the error row, then bumps the job's `error_records` counter
    /// with an atomic SQL increment rather than a read-modify-write, so
    /// concurrent recorders within one job cannot lose counts.
    pub async fn record(
        &self,
        sync_job_id: Uuid,
        entity_type: &str,
        external_id: &str,
        error_type: SyncErrorType,
        error_message: &str,
        raw_data: Option<JsonValue>,
    ) -> Result<Model, LedgerError> {
        let job_exists = sync_job::Entity::find_by_id(sync_job_id)
            .one(&self.db)
            .await?
            .is_some();
        if !job_exists {
            return Err(LedgerError::job_not_found(sync_job_id));
        }

        let error = ActiveModel {
            id: Set(Uuid::new_v4()),
            sync_job_id: Set(sync_job_id),
            entity_type: Set(entity_type.to_string()),
            external_id: Set(external_id.to_string()),
            error_type: Set(error_type),
            error_message: Set(error_message.to_string()),
            raw_data: Set(raw_data),
            resolved: Set(false),
            resolved_at: Set(None),
            resolved_by: Set(None),
            resolution: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let error = error.insert(&self.db).await?;

        sync_job::Entity::update_many()
            .col_expr(
                sync_job::Column::ErrorRecords,
                Expr::value(Expr::col(sync_job::Column::ErrorRecords).add(1)),
            )
            .filter(sync_job::Column::Id.eq(sync_job_id))
            .exec(&self.db)
            .await?;

        tracing::debug!(
            sync_job_id = %sync_job_id,
            error_id = %error.id,
            entity_type = %error.entity_type,
            external_id = %error.external_id,
            error_type = %error.error_type,
            "Sync error recorded"
        );

        Ok(error)
    }

    /// List a job's errors, newest first, optionally filtered by error type.
    pub async fn list_for_job(
        &self,
        sync_job_id: Uuid,
        error_type: Option<SyncErrorType>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Model>, LedgerError> {
        let mut query = Entity::find()
            .filter(Column::SyncJobId.eq(sync_job_id))
            .order_by_desc(Column::CreatedAt);

        if let Some(error_type) = error_type {
            query = query.filter(Column::ErrorType.eq(error_type));
        }

        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }

        Ok(query.all(&self.db).await?)
    }

    /// List a job's unresolved errors, oldest first.
    ///
    /// Ascending creation order so a retry loop replays failures in the
    /// order they originally occurred.
    pub async fn list_unresolved(&self, sync_job_id: Uuid) -> Result<Vec<Model>, LedgerError> {
        Ok(Entity::find()
            .filter(Column::SyncJobId.eq(sync_job_id))
            .filter(Column::Resolved.eq(false))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Mark an error resolved.
    ///
    /// A second call on an already-resolved error overwrites `resolution`,
    /// `resolved_by`, and `resolved_at` (last write wins); the resolved flag
    /// itself never reverts.
    pub async fn resolve(
        &self,
        error_id: Uuid,
        resolution: ErrorResolution,
        resolved_by: Option<&str>,
    ) -> Result<Model, LedgerError> {
        let error = Entity::find_by_id(error_id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::SyncErrorNotFound(error_id))?;

        let mut active: ActiveModel = error.into();
        active.resolved = Set(true);
        active.resolved_at = Set(Some(Utc::now().fixed_offset()));
        active.resolved_by = Set(Some(resolved_by.unwrap_or("system").to_string()));
        active.resolution = Set(Some(resolution));

        let error = active.update(&self.db).await?;
        tracing::info!(
            error_id = %error.id,
            sync_job_id = %error.sync_job_id,
            resolved_by = error.resolved_by.as_deref().unwrap_or("system"),
            "Sync error resolved"
        );
        Ok(error)
    }
}
