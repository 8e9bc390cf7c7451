use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{CatalogSnapshot, Facet, FacetLabels};
use crate::domain::accessory::{filter_records, AccessoryList, AccessoryRecord};
use crate::domain::model::ModelSpec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    #[default]
    ModelSelection,
    TypeSelection,
    SubtypeSelection,
    ShowProducts,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelSelection => "model_selection",
            Self::TypeSelection => "type_selection",
            Self::SubtypeSelection => "subtype_selection",
            Self::ShowProducts => "show_products",
        }
    }

    /// Parses a step name coming from outside the process. Unknown names fall
    /// back to model selection so a stale client can always continue.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "type_selection" => Self::TypeSelection,
            "subtype_selection" => Self::SubtypeSelection,
            "show_products" | "show_results" => Self::ShowProducts,
            _ => Self::ModelSelection,
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::ModelSelection => "User should specify a vehicle model, optionally with a year",
            Self::TypeSelection => "User should choose from the available accessory types",
            Self::SubtypeSelection => "User should select a specific subcategory",
            Self::ShowProducts => "User can ask for details or reset to start over",
        }
    }
}

/// Step names read back from payloads go through [`FlowStep::from_name`], so
/// transient names such as `offline_mode` land on model selection.
impl<'de> Deserialize<'de> for FlowStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session dialogue state. Mutated only by the flow engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationState {
    pub step: FlowStep,
    pub selected_model: Option<ModelSpec>,
    pub selected_year: Option<u16>,
    pub all_accessories: AccessoryList,
    pub labels: FacetLabels,
    pub available_types: Vec<Facet>,
    pub selected_type: Option<String>,
    pub available_sub_types: Vec<Facet>,
    pub selected_sub_type: Option<String>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            step: FlowStep::ModelSelection,
            selected_model: None,
            selected_year: None,
            all_accessories: Arc::from(Vec::new()),
            labels: FacetLabels::Derived,
            available_types: Vec::new(),
            selected_type: None,
            available_sub_types: Vec::new(),
            selected_sub_type: None,
        }
    }
}

impl ConversationState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Starts a conversation over a freshly loaded, non-empty catalog.
    pub(crate) fn begin(&mut self, snapshot: CatalogSnapshot) {
        let available_types = snapshot.labels.types(&snapshot.records);
        *self = Self {
            step: FlowStep::TypeSelection,
            selected_model: Some(snapshot.model),
            selected_year: Some(snapshot.year),
            all_accessories: snapshot.records,
            labels: snapshot.labels,
            available_types,
            ..Self::default()
        };
    }

    pub(crate) fn choose_type(&mut self, type_name: String, sub_types: Vec<Facet>) {
        self.selected_type = Some(type_name);
        self.available_sub_types = sub_types;
        self.selected_sub_type = None;
        self.step = if self.available_sub_types.is_empty() {
            FlowStep::ShowProducts
        } else {
            FlowStep::SubtypeSelection
        };
    }

    pub(crate) fn choose_sub_type(&mut self, sub_type: String) {
        self.selected_sub_type = Some(sub_type);
        self.step = FlowStep::ShowProducts;
    }

    pub fn model_key(&self) -> Option<&str> {
        self.selected_model.as_ref().map(|model| model.key.as_str())
    }

    /// Records matching the current type and subtype selection.
    pub fn selected_accessories(&self) -> Vec<AccessoryRecord> {
        match self.selected_type.as_deref() {
            Some(type_name) => filter_records(
                &self.all_accessories,
                type_name,
                self.selected_sub_type.as_deref(),
            ),
            None => self.all_accessories.to_vec(),
        }
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            step: self.step,
            selected_model: self.model_key().map(str::to_owned),
            selected_year: self.selected_year,
            selected_type: self.selected_type.clone(),
            selected_sub_type: self.selected_sub_type.clone(),
            total_accessories: self.all_accessories.len(),
            available_types: self.available_types.clone(),
            available_sub_types: self.available_sub_types.clone(),
            next_step: self.step.instruction().to_string(),
        }
    }
}

/// Read-only view of a conversation for diagnostics and tool callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub step: FlowStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_sub_type: Option<String>,
    pub total_accessories: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_types: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_sub_types: Vec<Facet>,
    pub next_step: String,
}
