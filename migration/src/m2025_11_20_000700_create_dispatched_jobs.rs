//! Migration to create the dispatched_jobs table.
//!
//! This migration creates the dispatched_jobs table, the durable queue behind
//! the task-dispatch boundary: named jobs with a structured payload, claimed
//! and executed by the background worker.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DispatchedJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DispatchedJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DispatchedJobs::Name).text().not_null())
                    .col(ColumnDef::new(DispatchedJobs::Queue).text().not_null())
                    .col(
                        ColumnDef::new(DispatchedJobs::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::Status)
                            .text()
                            .not_null()
                            .default("queued"),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(DispatchedJobs::Error).json_binary().null())
                    .col(
                        ColumnDef::new(DispatchedJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DispatchedJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index for picking the next ready job per queue using raw SQL
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_dispatched_jobs_status_queue_scheduled ON dispatched_jobs (status, queue, scheduled_at)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_dispatched_jobs_status_queue_scheduled")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DispatchedJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DispatchedJobs {
    Table,
    Id,
    Name,
    Queue,
    Payload,
    Status,
    Attempts,
    ScheduledAt,
    StartedAt,
    FinishedAt,
    Error,
    CreatedAt,
    UpdatedAt,
}
