pub mod cache;
pub mod client;
pub mod facets;
pub mod fixtures;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::accessory::AccessoryRecord;
use crate::domain::model::ModelSpec;

pub use cache::{CacheStatus, TtlCache};
pub use client::{
    CatalogClient, CatalogSnapshot, CatalogSummary, SearchHit, SearchResults, SEARCH_RESULT_LIMIT,
};
pub use facets::{
    categorize, extract_subtypes, extract_types, price_range, CategorySummary, Facet,
    FacetDescriptor, FacetLabels, PriceRange,
};
pub use memory::InMemoryCatalogSource;

/// Raw access to the product service. Implementations only move data; model
/// and year policy lives in [`CatalogClient`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_accessories(
        &self,
        model: &ModelSpec,
        year: u16,
    ) -> Result<Vec<AccessoryRecord>, CatalogError>;

    async fn fetch_type_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError>;

    async fn fetch_subtype_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("model `{model_key}` is not supported (known models: {known_models:?})")]
    UnsupportedModel { model_key: String, known_models: Vec<String> },
    #[error("model `{model_key}` has no catalog data for {year} (known years: {known_years:?})")]
    YearUnavailable { model_key: String, year: u16, known_years: Vec<u16> },
    #[error("catalog backend unavailable: {message}")]
    BackendUnavailable { message: String },
    #[error("catalog backend protocol failure: {message}")]
    Protocol { message: String },
}

impl CatalogError {
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable { message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }
}
