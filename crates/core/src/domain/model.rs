use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_YEAR: u16 = 2024;
const SUGGESTED_YEAR_COUNT: usize = 3;

/// Static reference data for one vehicle model the catalog knows about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub key: String,
    pub catalog_id: u32,
    pub years: Vec<u16>,
}

impl ModelSpec {
    pub fn new(key: impl Into<String>, catalog_id: u32, years: impl IntoIterator<Item = u16>) -> Self {
        let mut years = years.into_iter().collect::<Vec<_>>();
        years.sort_unstable();
        years.dedup();
        Self { key: key.into(), catalog_id, years }
    }

    pub fn supports_year(&self, year: u16) -> bool {
        self.years.contains(&year)
    }

    pub fn latest_year(&self) -> Option<u16> {
        self.years.last().copied()
    }

    /// The most recent known years, oldest first.
    pub fn suggested_years(&self) -> Vec<u16> {
        let skip = self.years.len().saturating_sub(SUGGESTED_YEAR_COUNT);
        self.years[skip..].to_vec()
    }

    pub fn display_name(&self) -> String {
        self.key.to_uppercase()
    }
}

/// Ordered set of known models. Order matters: utterance matching picks the
/// first registered model whose key appears in the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(default_models())
    }
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    pub fn find(&self, key: &str) -> Option<&ModelSpec> {
        let key = key.trim().to_ascii_lowercase();
        self.models.iter().find(|model| model.key == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.models.iter().map(|model| model.key.clone()).collect()
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

pub fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("alcazar", 34, 2021..=2024),
        ModelSpec::new("i20", 35, 2018..=2024),
        ModelSpec::new("creta", 36, 2018..=2024),
        ModelSpec::new("venue", 37, 2019..=2024),
        ModelSpec::new("aura", 38, 2020..=2024),
        ModelSpec::new("nios", 39, 2018..=2024),
    ]
}
