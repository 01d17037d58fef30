//! # Error Handling
//!
//! This module provides the unified error type for the roster sync ledger.
//! Every failure a caller can act on is a distinct variant, so worker and
//! monitoring callers match on the kind instead of parsing messages.

use thiserror::Error;
use uuid::Uuid;

use crate::models::sync_job::SyncJobStatus;

/// Errors surfaced by the job ledger, error log, and summary operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An operation referenced a job id or idempotency key with no matching row.
    #[error("sync job not found: {0}")]
    SyncJobNotFound(String),

    /// An operation referenced a sync error id with no matching row.
    #[error("sync error not found: {0}")]
    SyncErrorNotFound(Uuid),

    /// The job's current status does not permit the attempted transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: SyncJobStatus,
        to: SyncJobStatus,
    },

    /// A caller-supplied idempotency key failed format validation.
    #[error("invalid idempotency key '{key}': {reason}")]
    InvalidIdempotencyKey { key: String, reason: &'static str },

    /// Job creation was attempted with an empty entity-type set.
    #[error("sync job requires at least one entity type")]
    EmptyEntityTypes,

    /// Underlying store failure.
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl LedgerError {
    pub fn job_not_found(id: Uuid) -> Self {
        Self::SyncJobNotFound(id.to_string())
    }
}
