//! # Provider Clients
//!
//! HTTP clients for the remote systems the engine talks to, each behind a
//! trait so orchestration code can be exercised without a network. Every
//! client maps non-2xx responses and embedded error objects into
//! [`crate::error::ProviderError`], preserving the raw payload.

pub mod catalog;
pub mod channel;
pub mod commerce;
pub mod incident;

pub use catalog::{CatalogApi, GraphCatalogClient, RemoteCatalog};
pub use channel::{ChannelClient, ChannelNotifier};
pub use commerce::{
    CommerceApi, CommerceApiFactory, CommerceClient, DefaultCommerceFactory, ProductPage,
    RemoteProduct,
};
pub use incident::{HttpIncidentNotifier, Incident, IncidentNotifier};
