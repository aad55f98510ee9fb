//! Migration to create the product_feeds table.
//!
//! This migration creates the product_feeds table which tracks feed upload
//! targets registered with the remote catalog provider for a catalog.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductFeeds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductFeeds::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductFeeds::CatalogId).uuid().not_null())
                    .col(ColumnDef::new(ProductFeeds::RemoteFeedId).text().not_null())
                    .col(ColumnDef::new(ProductFeeds::Name).text().not_null())
                    .col(
                        ColumnDef::new(ProductFeeds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_feeds_catalog_id")
                            .from(ProductFeeds::Table, ProductFeeds::CatalogId)
                            .to(Catalogs::Table, Catalogs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_feeds_catalog_id")
                    .table(ProductFeeds::Table)
                    .col(ProductFeeds::CatalogId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_feeds_catalog_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProductFeeds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductFeeds {
    Table,
    Id,
    CatalogId,
    RemoteFeedId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Catalogs {
    Table,
    Id,
}
