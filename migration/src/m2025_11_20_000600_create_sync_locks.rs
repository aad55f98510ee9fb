//! Migration to create the sync_locks table.
//!
//! This migration creates the sync_locks table backing the distributed lock
//! primitive: one row per held key with holder identity, an optional
//! diagnostic payload, and a TTL expiry.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncLocks::Key)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncLocks::Holder).text().not_null())
                    .col(ColumnDef::new(SyncLocks::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(SyncLocks::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncLocks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncLocks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncLocks {
    Table,
    Key,
    Holder,
    Payload,
    AcquiredAt,
    ExpiresAt,
}
