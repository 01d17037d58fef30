//! Migration to create the sync_jobs table.
//!
//! This migration creates the sync_jobs table which tracks one roster
//! synchronization attempt per row, including the unique idempotency key
//! that suppresses duplicate concurrent job creation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::OwnerId).text().not_null())
                    .col(ColumnDef::new(SyncJobs::Source).text().not_null())
                    .col(ColumnDef::new(SyncJobs::EntityTypes).json_binary().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::IdempotencyKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::TotalRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::ProcessedRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::CreatedRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::UpdatedRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::ErrorRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Idempotency keys are unique for the lifetime of the store.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_idempotency_key")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Owner listing views are newest-first.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_owner_created")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::OwnerId)
                    .col(SyncJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Status rollups and filtered listings per owner.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_owner_status")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::OwnerId)
                    .col(SyncJobs::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_jobs_idempotency_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sync_jobs_owner_created").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sync_jobs_owner_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    OwnerId,
    Source,
    EntityTypes,
    Status,
    IdempotencyKey,
    TotalRecords,
    ProcessedRecords,
    CreatedRecords,
    UpdatedRecords,
    ErrorRecords,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}
