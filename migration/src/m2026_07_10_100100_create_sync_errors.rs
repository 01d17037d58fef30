//! Migration to create the sync_errors table.
//!
//! One row per failed source record (or per whole-job failure reason),
//! owned by a sync job and dropped with it on cascade.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncErrors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncErrors::SyncJobId).uuid().not_null())
                    .col(ColumnDef::new(SyncErrors::EntityType).text().not_null())
                    .col(ColumnDef::new(SyncErrors::ExternalId).text().not_null())
                    .col(
                        ColumnDef::new(SyncErrors::ErrorType)
                            .text()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(SyncErrors::ErrorMessage).text().not_null())
                    .col(ColumnDef::new(SyncErrors::RawData).json_binary().null())
                    .col(
                        ColumnDef::new(SyncErrors::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SyncErrors::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncErrors::ResolvedBy).text().null())
                    .col(ColumnDef::new(SyncErrors::Resolution).text().null())
                    .col(
                        ColumnDef::new(SyncErrors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_errors_sync_job_id")
                            .from(SyncErrors::Table, SyncErrors::SyncJobId)
                            .to(SyncJobs::Table, SyncJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Per-job listings are newest-first.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_errors_job_created")
                    .table(SyncErrors::Table)
                    .col(SyncErrors::SyncJobId)
                    .col(SyncErrors::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Unresolved-triage scans: resolved flag first, then creation order.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_errors_job_resolved_created")
                    .table(SyncErrors::Table)
                    .col(SyncErrors::SyncJobId)
                    .col(SyncErrors::Resolved)
                    .col(SyncErrors::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_errors_job_created").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_errors_job_resolved_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncErrors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncErrors {
    Table,
    Id,
    SyncJobId,
    EntityType,
    ExternalId,
    ErrorType,
    ErrorMessage,
    RawData,
    Resolved,
    ResolvedAt,
    ResolvedBy,
    Resolution,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
}
