//! # Sync Summary Repository
//!
//! Read-only per-owner rollups over the sync_jobs table. No writes; the
//! only failure mode is the store itself.

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::models::sync_job::{Column, Entity, SyncJobStatus};

/// Per-owner rollup of job counts and record totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJobSummary {
    pub total: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Most recent completion among the owner's `completed` jobs
    pub last_completed_at: Option<DateTimeWithTimeZone>,
    /// Sum of `processed_records` across all of the owner's jobs
    pub total_records_processed: i64,
    /// Sum of `error_records` across all of the owner's jobs
    pub total_errors: i64,
}

/// Repository for read-side sync job rollups
pub struct SyncSummaryRepository {
    db: DatabaseConnection,
}

impl SyncSummaryRepository {
    /// Create a new SyncSummaryRepository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Roll up an owner's jobs: counts by status, last completion, record sums.
    pub async fn summarize(&self, owner_id: &str) -> Result<SyncJobSummary, LedgerError> {
        let counts: Vec<(SyncJobStatus, i64)> = Entity::find()
            .select_only()
            .column(Column::Status)
            .column_as(Column::Id.count(), "count")
            .filter(Column::OwnerId.eq(owner_id))
            .group_by(Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let sums: Option<(Option<i64>, Option<i64>)> = Entity::find()
            .select_only()
            .column_as(Column::ProcessedRecords.sum(), "records_processed")
            .column_as(Column::ErrorRecords.sum(), "errors")
            .filter(Column::OwnerId.eq(owner_id))
            .into_tuple()
            .one(&self.db)
            .await?;

        let last_completed_at: Option<Option<DateTimeWithTimeZone>> = Entity::find()
            .select_only()
            .column_as(Column::CompletedAt.max(), "last_completed_at")
            .filter(Column::OwnerId.eq(owner_id))
            .filter(Column::Status.eq(SyncJobStatus::Completed))
            .into_tuple()
            .one(&self.db)
            .await?;

        let mut summary = SyncJobSummary {
            total: 0,
            pending: 0,
            running: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            last_completed_at: last_completed_at.flatten(),
            total_records_processed: 0,
            total_errors: 0,
        };

        for (status, count) in counts {
            let count = count.max(0) as u64;
            summary.total += count;
            match status {
                SyncJobStatus::Pending => summary.pending = count,
                SyncJobStatus::Running => summary.running = count,
                SyncJobStatus::Completed => summary.completed = count,
                SyncJobStatus::Failed => summary.failed = count,
                SyncJobStatus::Cancelled => summary.cancelled = count,
            }
        }

        if let Some((records_processed, errors)) = sums {
            summary.total_records_processed = records_processed.unwrap_or(0);
            summary.total_errors = errors.unwrap_or(0);
        }

        Ok(summary)
    }
}
