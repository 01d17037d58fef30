//! # Data Models
//!
//! This module contains the SeaORM entities used throughout the roster sync
//! ledger.

pub mod sync_error;
pub mod sync_job;

pub use sync_error::Entity as SyncError;
pub use sync_job::Entity as SyncJob;
