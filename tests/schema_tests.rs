//! Integration tests for the ledger schema.
//!
//! Verifies migrations produce the expected tables, columns, and the
//! unique idempotency-key index.

#[path = "test_utils/mod.rs"]
mod test_utils;

use anyhow::Result;
use sea_orm::{ConnectionTrait, Statement};
use test_utils::setup_test_db;

#[tokio::test]
async fn sync_jobs_table_created_with_correct_schema() -> Result<()> {
    let db = setup_test_db().await?;

    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master WHERE name = 'sync_jobs'".to_string(),
    );
    let result = db.query_one(stmt).await?;
    assert!(result.is_some(), "sync_jobs table should exist");

    let stmt = Statement::from_string(
        db.get_database_backend(),
        "PRAGMA table_info(sync_jobs)".to_string(),
    );
    let columns = db.query_all(stmt).await?;

    let expected_columns = vec![
        "id",
        "owner_id",
        "source",
        "entity_types",
        "status",
        "idempotency_key",
        "total_records",
        "processed_records",
        "created_records",
        "updated_records",
        "error_records",
        "started_at",
        "completed_at",
        "created_at",
        "updated_at",
    ];

    assert_eq!(
        columns.len(),
        expected_columns.len(),
        "sync_jobs table should have correct number of columns"
    );

    Ok(())
}

#[tokio::test]
async fn sync_errors_table_created_with_correct_schema() -> Result<()> {
    let db = setup_test_db().await?;

    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master WHERE name = 'sync_errors'".to_string(),
    );
    let result = db.query_one(stmt).await?;
    assert!(result.is_some(), "sync_errors table should exist");

    let stmt = Statement::from_string(
        db.get_database_backend(),
        "PRAGMA table_info(sync_errors)".to_string(),
    );
    let columns = db.query_all(stmt).await?;

    let expected_columns = vec![
        "id",
        "sync_job_id",
        "entity_type",
        "external_id",
        "error_type",
        "error_message",
        "raw_data",
        "resolved",
        "resolved_at",
        "resolved_by",
        "resolution",
        "created_at",
    ];

    assert_eq!(
        columns.len(),
        expected_columns.len(),
        "sync_errors table should have correct number of columns"
    );

    Ok(())
}

#[tokio::test]
async fn idempotency_key_index_is_unique() -> Result<()> {
    let db = setup_test_db().await?;

    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT sql FROM sqlite_master WHERE type = 'index' \
         AND name = 'idx_sync_jobs_idempotency_key'"
            .to_string(),
    );
    let row = db.query_one(stmt).await?.expect("index should exist");
    let sql: String = row.try_get("", "sql")?;
    assert!(sql.to_uppercase().contains("UNIQUE"));

    Ok(())
}
