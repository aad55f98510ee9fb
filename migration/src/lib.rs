//! Database migrations for the catalog sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_11_20_000100_create_apps;
mod m2025_11_20_000200_create_catalogs;
mod m2025_11_20_000300_create_product_feeds;
mod m2025_11_20_000400_create_upload_products;
mod m2025_11_20_000500_create_product_upload_logs;
mod m2025_11_20_000600_create_sync_locks;
mod m2025_11_20_000700_create_dispatched_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_20_000100_create_apps::Migration),
            Box::new(m2025_11_20_000200_create_catalogs::Migration),
            Box::new(m2025_11_20_000300_create_product_feeds::Migration),
            Box::new(m2025_11_20_000400_create_upload_products::Migration),
            Box::new(m2025_11_20_000500_create_product_upload_logs::Migration),
            Box::new(m2025_11_20_000600_create_sync_locks::Migration),
            Box::new(m2025_11_20_000700_create_dispatched_jobs::Migration),
        ]
    }
}
