use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::cache::TtlCache;
use crate::catalog::facets::{
    categorize, price_range, CategorySummary, Facet, FacetDescriptor, FacetLabels, PriceRange,
};
use crate::catalog::{CatalogError, CatalogSource};
use crate::config::{CatalogConfig, CatalogStrategy};
use crate::domain::accessory::{AccessoryList, AccessoryRecord};
use crate::domain::model::{ModelRegistry, ModelSpec};

pub const SEARCH_RESULT_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum DescriptorKind {
    Types,
    Subtypes,
}

/// Everything a conversation needs after choosing a model and year.
#[derive(Clone, Debug)]
pub struct CatalogSnapshot {
    pub model: ModelSpec,
    pub year: u16,
    pub records: AccessoryList,
    pub labels: FacetLabels,
}

impl CatalogSnapshot {
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            model: self.model.key.clone(),
            year: self.year,
            total_accessories: self.records.len(),
            types: self.labels.types(&self.records),
            sub_types: self.labels.subtypes(&self.records),
            price_range: price_range(&self.records),
            categories: categorize(&self.records),
        }
    }
}

/// Aggregate view of one model/year listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub model: String,
    pub year: u16,
    pub total_accessories: usize,
    pub types: Vec<Facet>,
    pub sub_types: Vec<Facet>,
    pub price_range: PriceRange,
    pub categories: BTreeMap<String, CategorySummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub term: String,
    pub model: String,
    pub total_results: usize,
    pub accessories: Vec<SearchHit>,
}

/// A matching record; cross-model searches also name the model it fits.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: AccessoryRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_model: Option<String>,
}

/// Policy layer over a [`CatalogSource`]: model/year validation, the
/// read-through cache and the facet naming strategy.
pub struct CatalogClient {
    source: Arc<dyn CatalogSource>,
    registry: ModelRegistry,
    strategy: CatalogStrategy,
    accessories: TtlCache<(String, u16), AccessoryList>,
    descriptors: TtlCache<DescriptorKind, Arc<[FacetDescriptor]>>,
}

impl CatalogClient {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        registry: ModelRegistry,
        strategy: CatalogStrategy,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            strategy,
            accessories: TtlCache::new(cache_ttl),
            descriptors: TtlCache::new(cache_ttl),
        }
    }

    pub fn from_config(source: Arc<dyn CatalogSource>, config: &CatalogConfig) -> Self {
        Self::new(
            source,
            ModelRegistry::new(config.models.clone()),
            config.strategy,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn strategy(&self) -> CatalogStrategy {
        self.strategy
    }

    pub fn resolve(&self, model_key: &str, year: u16) -> Result<&ModelSpec, CatalogError> {
        let model = self.registry.find(model_key).ok_or_else(|| CatalogError::UnsupportedModel {
            model_key: model_key.to_string(),
            known_models: self.registry.keys(),
        })?;

        if !model.supports_year(year) {
            return Err(CatalogError::YearUnavailable {
                model_key: model.key.clone(),
                year,
                known_years: model.years.clone(),
            });
        }

        Ok(model)
    }

    /// All accessories for a model and year. An empty list is a successful
    /// answer; callers decide what emptiness means.
    pub async fn fetch(&self, model_key: &str, year: u16) -> Result<AccessoryList, CatalogError> {
        let model = self.resolve(model_key, year)?;
        let key = (model.key.clone(), year);

        info!(
            event_name = "catalog.fetch.started",
            model_key = %model.key,
            catalog_id = model.catalog_id,
            year,
            "fetching accessories"
        );

        let fetched = self
            .accessories
            .get_or_try_fetch(key, || async {
                let records = self.source.fetch_accessories(model, year).await?;
                Ok::<_, CatalogError>(AccessoryList::from(records))
            })
            .await;

        match fetched {
            Ok((records, cache)) => {
                info!(
                    event_name = "catalog.fetch.completed",
                    model_key = %model.key,
                    year,
                    record_count = records.len(),
                    cache = cache.as_str(),
                    "accessories fetched"
                );
                Ok(records)
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.fetch.failed",
                    model_key = %model.key,
                    year,
                    error = %error,
                    "accessory fetch failed"
                );
                Err(error)
            }
        }
    }

    /// Fetches the records and, for the endpoint strategy, the backend's facet
    /// reference lists. Reference lists are skipped when there are no records.
    pub async fn load(&self, model_key: &str, year: u16) -> Result<CatalogSnapshot, CatalogError> {
        let records = self.fetch(model_key, year).await?;
        let model = self.resolve(model_key, year)?.clone();

        let labels = match self.strategy {
            CatalogStrategy::Endpoint if !records.is_empty() => FacetLabels::Backend {
                types: self.descriptor_list(DescriptorKind::Types).await?,
                subtypes: self.descriptor_list(DescriptorKind::Subtypes).await?,
            },
            _ => FacetLabels::Derived,
        };

        Ok(CatalogSnapshot { model, year, records, labels })
    }

    /// Case-insensitive containment search over name, type, subtype and
    /// description. Without a model every known model is scanned at `year`
    /// (or its newest year) and models that fail to load are skipped.
    pub async fn search(
        &self,
        term: &str,
        model_key: Option<&str>,
        year: Option<u16>,
    ) -> Result<SearchResults, CatalogError> {
        let needle = term.trim().to_lowercase();
        let mut candidates: Vec<SearchHit> = Vec::new();

        let label = match model_key {
            Some(model_key) => {
                let model = self.registry.find(model_key).ok_or_else(|| {
                    CatalogError::UnsupportedModel {
                        model_key: model_key.to_string(),
                        known_models: self.registry.keys(),
                    }
                })?;
                let year = search_year(model, year);
                candidates.extend(
                    self.fetch(&model.key, year)
                        .await?
                        .iter()
                        .map(|record| SearchHit { record: record.clone(), source_model: None }),
                );
                model.key.clone()
            }
            None => {
                for model in self.registry.models() {
                    let year = search_year(model, year);
                    match self.fetch(&model.key, year).await {
                        Ok(records) => {
                            candidates.extend(records.iter().map(|record| SearchHit {
                                record: record.clone(),
                                source_model: Some(model.key.clone()),
                            }))
                        }
                        Err(error) => warn!(
                            event_name = "catalog.search.model_skipped",
                            model_key = %model.key,
                            year,
                            error = %error,
                            "skipping model during search"
                        ),
                    }
                }
                "All Models".to_string()
            }
        };

        let matches = candidates
            .into_iter()
            .filter(|hit| hit.record.search_text().contains(&needle))
            .collect::<Vec<_>>();
        let total_results = matches.len();
        debug!(event_name = "catalog.search.completed", term = %needle, total_results, "search done");

        Ok(SearchResults {
            term: term.to_string(),
            model: label,
            total_results,
            accessories: matches.into_iter().take(SEARCH_RESULT_LIMIT).collect(),
        })
    }

    /// The backend's accessory type reference list, ordered as served.
    pub async fn type_descriptors(&self) -> Result<Arc<[FacetDescriptor]>, CatalogError> {
        self.descriptor_list(DescriptorKind::Types).await
    }

    pub async fn subtype_descriptors(&self) -> Result<Arc<[FacetDescriptor]>, CatalogError> {
        self.descriptor_list(DescriptorKind::Subtypes).await
    }

    async fn descriptor_list(
        &self,
        kind: DescriptorKind,
    ) -> Result<Arc<[FacetDescriptor]>, CatalogError> {
        let (descriptors, cache) = self
            .descriptors
            .get_or_try_fetch(kind, || async {
                let list = match kind {
                    DescriptorKind::Types => self.source.fetch_type_descriptors().await?,
                    DescriptorKind::Subtypes => self.source.fetch_subtype_descriptors().await?,
                };
                Ok::<_, CatalogError>(Arc::<[FacetDescriptor]>::from(list))
            })
            .await?;
        debug!(
            event_name = "catalog.descriptors.loaded",
            kind = ?kind,
            count = descriptors.len(),
            cache = cache.as_str(),
            "facet descriptors loaded"
        );
        Ok(descriptors)
    }
}

fn search_year(model: &ModelSpec, requested: Option<u16>) -> u16 {
    requested
        .filter(|year| model.supports_year(*year))
        .or_else(|| model.latest_year())
        .unwrap_or(crate::domain::model::DEFAULT_MODEL_YEAR)
}
