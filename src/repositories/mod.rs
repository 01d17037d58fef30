//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the ledger's entities. Each repository takes its database
//! handle by constructor injection; lifecycle of the pool belongs to the
//! process entry point.

pub mod summary;
pub mod sync_error;
pub mod sync_job;

pub use summary::{SyncJobSummary, SyncSummaryRepository};
pub use sync_error::SyncErrorRepository;
pub use sync_job::{ProgressUpdate, SyncJobRepository};
