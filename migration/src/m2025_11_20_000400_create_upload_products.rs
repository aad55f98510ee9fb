//! Migration to create the upload_products table.
//!
//! This migration creates the upload_products table which holds one row per
//! (product, catalog) pending or attempted upload, with the status column
//! driving batch selection.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UploadProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UploadProducts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UploadProducts::CatalogId).uuid().not_null())
                    .col(
                        ColumnDef::new(UploadProducts::RemoteProductId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UploadProducts::Data).text().not_null())
                    .col(
                        ColumnDef::new(UploadProducts::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(UploadProducts::ModifiedOn)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_upload_products_catalog_id")
                            .from(UploadProducts::Table, UploadProducts::CatalogId)
                            .to(Catalogs::Table, Catalogs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (catalog, remote product id); staging upserts against this
        manager
            .create_index(
                Index::create()
                    .name("idx_upload_products_catalog_remote")
                    .table(UploadProducts::Table)
                    .col(UploadProducts::CatalogId)
                    .col(UploadProducts::RemoteProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Batch selection scans (catalog, status) ordered by modified_on
        manager
            .create_index(
                Index::create()
                    .name("idx_upload_products_catalog_status_modified")
                    .table(UploadProducts::Table)
                    .col(UploadProducts::CatalogId)
                    .col(UploadProducts::Status)
                    .col(UploadProducts::ModifiedOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_upload_products_catalog_remote")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_upload_products_catalog_status_modified")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UploadProducts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UploadProducts {
    Table,
    Id,
    CatalogId,
    RemoteProductId,
    Data,
    Status,
    ModifiedOn,
}

#[derive(DeriveIden)]
enum Catalogs {
    Table,
    Id,
}
