//! Migration to create the product_upload_logs table.
//!
//! This migration creates the append-only product_upload_logs table which
//! records every SKU successfully sent to the remote catalog provider.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductUploadLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductUploadLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductUploadLogs::SkuId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductUploadLogs::AppId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProductUploadLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_upload_logs_app_id")
                            .from(ProductUploadLogs::Table, ProductUploadLogs::AppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_upload_logs_app_created")
                    .table(ProductUploadLogs::Table)
                    .col(ProductUploadLogs::AppId)
                    .col(ProductUploadLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_upload_logs_app_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProductUploadLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductUploadLogs {
    Table,
    Id,
    SkuId,
    AppId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Apps {
    Table,
    Id,
}
