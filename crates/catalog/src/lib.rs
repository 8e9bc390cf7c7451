//! HTTP access to the accessory product service.
//!
//! [`HttpCatalogSource`] only moves bytes and classifies transport failures;
//! model/year policy, caching and facet naming stay in
//! `kitfinder_core::CatalogClient`.

pub mod http;

pub use http::{HttpCatalogSource, HttpCatalogSourceConfig};
