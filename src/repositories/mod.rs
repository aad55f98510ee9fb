//! # Repositories
//!
//! This module contains repository structs encapsulating SeaORM operations
//! for each entity. No hidden cross-entity traversal: every query or update
//! a component needs is a named operation here.

pub mod app;
pub mod catalog;
pub mod product_feed;
pub mod upload_log;
pub mod upload_product;

pub use app::AppRepository;
pub use catalog::CatalogRepository;
pub use product_feed::ProductFeedRepository;
pub use upload_log::UploadLogRepository;
pub use upload_product::UploadProductRepository;
