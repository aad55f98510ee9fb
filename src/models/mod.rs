//! # Data Models
//!
//! This module contains all the SeaORM entity models used by the catalog
//! sync service.

pub mod app;
pub mod catalog;
pub mod dispatched_job;
pub mod product_feed;
pub mod product_upload_log;
pub mod sync_lock;
pub mod upload_product;

pub use app::Entity as App;
pub use catalog::Entity as Catalog;
pub use dispatched_job::Entity as DispatchedJob;
pub use product_feed::Entity as ProductFeed;
pub use product_upload_log::Entity as ProductUploadLog;
pub use sync_lock::Entity as SyncLock;
pub use upload_product::Entity as UploadProduct;
