use std::time::Duration;

use async_trait::async_trait;
use kitfinder_core::catalog::{CatalogError, CatalogSource, FacetDescriptor};
use kitfinder_core::config::CatalogConfig;
use kitfinder_core::domain::accessory::AccessoryRecord;
use kitfinder_core::domain::model::ModelSpec;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const ACCESSORIES_PATH: &str = "/accessories";
const TYPES_PATH: &str = "/accessory-types";
const SUBTYPES_PATH: &str = "/accessory-subtypes";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpCatalogSourceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl From<&CatalogConfig> for HttpCatalogSourceConfig {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpCatalogSource {
    client: Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(config: HttpCatalogSourceConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|error| CatalogError::protocol(format!("http client setup failed: {error}")))?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_list<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>, CatalogError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response =
            self.client.get(&url).query(query).send().await.map_err(|error| classify(&url, error))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "catalog.http.status",
                url = %url,
                status = %status,
                "catalog backend returned an error status"
            );
            return Err(status_error(&url, status));
        }

        let body = response.bytes().await.map_err(|error| classify(&url, error))?;
        let records = serde_json::from_slice::<Option<Vec<T>>>(&body).map_err(|error| {
            CatalogError::protocol(format!("undecodable response from {url}: {error}"))
        })?;
        let records = records.unwrap_or_default();

        debug!(
            event_name = "catalog.http.completed",
            url = %url,
            record_count = records.len(),
            "catalog request completed"
        );
        Ok(records)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_accessories(
        &self,
        model: &ModelSpec,
        year: u16,
    ) -> Result<Vec<AccessoryRecord>, CatalogError> {
        self.get_list(
            ACCESSORIES_PATH,
            &[("modelId", model.catalog_id.to_string()), ("year", year.to_string())],
        )
        .await
    }

    async fn fetch_type_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError> {
        self.get_list(TYPES_PATH, &[]).await
    }

    async fn fetch_subtype_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError> {
        self.get_list(SUBTYPES_PATH, &[]).await
    }
}

/// Transport failures mean the backend could not be reached; anything that
/// got an answer we could not use is a protocol failure.
fn classify(url: &str, error: reqwest::Error) -> CatalogError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        CatalogError::backend_unavailable(format!("{url}: {error}"))
    } else {
        CatalogError::protocol(format!("{url}: {error}"))
    }
}

fn status_error(url: &str, status: StatusCode) -> CatalogError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            CatalogError::backend_unavailable(format!("{url} returned {status}"))
        }
        _ => CatalogError::protocol(format!("{url} returned {status}")),
    }
}
