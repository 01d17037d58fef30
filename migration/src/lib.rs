//! Database migrations for the roster sync ledger.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_07_10_100000_create_sync_jobs;
mod m2026_07_10_100100_create_sync_errors;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_07_10_100000_create_sync_jobs::Migration),
            Box::new(m2026_07_10_100100_create_sync_errors::Migration),
        ]
    }
}
