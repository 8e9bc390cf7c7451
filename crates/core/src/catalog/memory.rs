use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{CatalogError, CatalogSource, FacetDescriptor};
use crate::domain::accessory::AccessoryRecord;
use crate::domain::model::ModelSpec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceMode {
    #[default]
    Online,
    Offline,
    ProtocolFailure,
}

/// Catalog source backed by process memory. Used by tests and the offline
/// demo; its failure modes mirror what the HTTP source reports.
#[derive(Default)]
pub struct InMemoryCatalogSource {
    accessories: RwLock<HashMap<(u32, u16), Vec<AccessoryRecord>>>,
    type_descriptors: RwLock<Vec<FacetDescriptor>>,
    subtype_descriptors: RwLock<Vec<FacetDescriptor>>,
    mode: Mutex<SourceMode>,
    latency: Option<Duration>,
    accessory_fetches: AtomicUsize,
    descriptor_fetches: AtomicUsize,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accessories(self, catalog_id: u32, year: u16, records: Vec<AccessoryRecord>) -> Self {
        self.insert_accessories(catalog_id, year, records);
        self
    }

    pub fn with_descriptors(
        self,
        types: Vec<FacetDescriptor>,
        subtypes: Vec<FacetDescriptor>,
    ) -> Self {
        *write(&self.type_descriptors) = types;
        *write(&self.subtype_descriptors) = subtypes;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert_accessories(&self, catalog_id: u32, year: u16, records: Vec<AccessoryRecord>) {
        write(&self.accessories).insert((catalog_id, year), records);
    }

    pub fn set_mode(&self, mode: SourceMode) {
        match self.mode.lock() {
            Ok(mut current) => *current = mode,
            Err(poisoned) => *poisoned.into_inner() = mode,
        }
    }

    pub fn accessory_fetches(&self) -> usize {
        self.accessory_fetches.load(Ordering::SeqCst)
    }

    pub fn descriptor_fetches(&self) -> usize {
        self.descriptor_fetches.load(Ordering::SeqCst)
    }

    fn mode(&self) -> SourceMode {
        match self.mode.lock() {
            Ok(mode) => *mode,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    async fn simulate_call(&self) -> Result<(), CatalogError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.mode() {
            SourceMode::Online => Ok(()),
            SourceMode::Offline => {
                Err(CatalogError::backend_unavailable("connection refused (in-memory offline mode)"))
            }
            SourceMode::ProtocolFailure => {
                Err(CatalogError::protocol("backend returned 502 Bad Gateway (in-memory)"))
            }
        }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn fetch_accessories(
        &self,
        model: &ModelSpec,
        year: u16,
    ) -> Result<Vec<AccessoryRecord>, CatalogError> {
        self.accessory_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        let records = read(&self.accessories).get(&(model.catalog_id, year)).cloned();
        Ok(records.unwrap_or_default())
    }

    async fn fetch_type_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError> {
        self.descriptor_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        Ok(read(&self.type_descriptors).clone())
    }

    async fn fetch_subtype_descriptors(&self) -> Result<Vec<FacetDescriptor>, CatalogError> {
        self.descriptor_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        Ok(read(&self.subtype_descriptors).clone())
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
