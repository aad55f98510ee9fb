//! Migration to create the catalogs table.
//!
//! This migration creates the catalogs table which mirrors remote catalog
//! resources locally, owned by a channel app and optionally linked to the
//! e-commerce app that feeds it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Catalogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Catalogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Catalogs::AppId).uuid().not_null())
                    .col(ColumnDef::new(Catalogs::RemoteId).text().not_null())
                    .col(ColumnDef::new(Catalogs::Name).text().not_null())
                    .col(ColumnDef::new(Catalogs::Category).text().null())
                    .col(ColumnDef::new(Catalogs::CommerceAppId).uuid().null())
                    .col(
                        ColumnDef::new(Catalogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Catalogs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogs_app_id")
                            .from(Catalogs::Table, Catalogs::AppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogs_commerce_app_id")
                            .from(Catalogs::Table, Catalogs::CommerceAppId)
                            .to(Apps::Table, Apps::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one local catalog per (owning app, remote catalog id)
        manager
            .create_index(
                Index::create()
                    .name("idx_catalogs_app_remote")
                    .table(Catalogs::Table)
                    .col(Catalogs::AppId)
                    .col(Catalogs::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalogs_commerce_app_id")
                    .table(Catalogs::Table)
                    .col(Catalogs::CommerceAppId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_catalogs_app_remote").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_catalogs_commerce_app_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Catalogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Catalogs {
    Table,
    Id,
    AppId,
    RemoteId,
    Name,
    Category,
    CommerceAppId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Apps {
    Table,
    Id,
}
