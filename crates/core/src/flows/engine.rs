use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{price_range, CatalogClient, CatalogError, Facet, PriceRange};
use crate::domain::accessory::{filter_records, AccessoryRecord};
use crate::domain::model::{ModelSpec, DEFAULT_MODEL_YEAR};
use crate::flows::matcher::Utterance;
use crate::flows::states::{ConversationState, FlowStep};

/// What a single turn did, before it is shaped for the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowOutcome {
    ModelSelected {
        model: ModelSpec,
        year: u16,
        total: usize,
        types: Vec<Facet>,
        price_range: PriceRange,
    },
    UnsupportedModel {
        known_models: Vec<String>,
    },
    YearUnavailable {
        model: ModelSpec,
        year: u16,
    },
    EmptyResult {
        model: ModelSpec,
        year: u16,
    },
    BackendUnavailable {
        model: ModelSpec,
        year: u16,
    },
    NoAccessoriesLoaded,
    TypeSelected {
        model: ModelSpec,
        year: u16,
        type_name: String,
        item_count: usize,
        sub_types: Vec<Facet>,
        price_range: PriceRange,
    },
    InvalidType {
        types: Vec<Facet>,
    },
    InvalidSubType {
        sub_types: Vec<Facet>,
    },
    ProductsShown {
        model: ModelSpec,
        year: u16,
        type_name: String,
        sub_type: Option<String>,
        products: Vec<AccessoryRecord>,
        repeated: bool,
    },
}

impl FlowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::ModelSelected { .. } | Self::TypeSelected { .. } | Self::ProductsShown { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub from: FlowStep,
    pub to: FlowStep,
    pub outcome: FlowOutcome,
}

/// Failures the conversation cannot absorb. State is left as it was.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("catalog lookup for {model_key} {year} failed: {source}")]
    Catalog {
        model_key: String,
        year: u16,
        #[source]
        source: CatalogError,
    },
}

/// Dialogue controller: matches an utterance against the options legal at the
/// current step and moves the state forward.
pub struct FlowEngine {
    catalog: Arc<CatalogClient>,
}

impl FlowEngine {
    pub fn new(catalog: Arc<CatalogClient>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub async fn advance(
        &self,
        state: &mut ConversationState,
        utterance: &str,
    ) -> Result<TurnOutcome, FlowError> {
        let from = state.step;
        let utterance = Utterance::new(utterance);

        let outcome = match state.step {
            FlowStep::ModelSelection => self.select_model(state, &utterance).await?,
            FlowStep::TypeSelection => select_type(state, &utterance),
            FlowStep::SubtypeSelection => select_sub_type(state, &utterance),
            FlowStep::ShowProducts => show_products(state),
        };

        debug!(
            event_name = "flow.step.evaluated",
            from = %from,
            to = %state.step,
            success = outcome.is_success(),
            "flow step evaluated"
        );
        Ok(TurnOutcome { from, to: state.step, outcome })
    }

    async fn select_model(
        &self,
        state: &mut ConversationState,
        utterance: &Utterance,
    ) -> Result<FlowOutcome, FlowError> {
        let registry = self.catalog.registry();
        let Some(model) = utterance.first_match(registry.models(), |model| model.key.as_str())
        else {
            return Ok(FlowOutcome::UnsupportedModel { known_models: registry.keys() });
        };
        let model = model.clone();
        let year = utterance.year().unwrap_or(DEFAULT_MODEL_YEAR);

        match self.catalog.load(&model.key, year).await {
            Ok(snapshot) if snapshot.records.is_empty() => {
                Ok(FlowOutcome::EmptyResult { model, year })
            }
            Ok(snapshot) => {
                let total = snapshot.records.len();
                let price_range = price_range(&snapshot.records);
                state.begin(snapshot);
                Ok(FlowOutcome::ModelSelected {
                    model,
                    year,
                    total,
                    types: state.available_types.clone(),
                    price_range,
                })
            }
            Err(CatalogError::YearUnavailable { .. }) => {
                Ok(FlowOutcome::YearUnavailable { model, year })
            }
            Err(CatalogError::BackendUnavailable { message }) => {
                warn!(
                    event_name = "flow.catalog.offline",
                    model_key = %model.key,
                    year,
                    error = %message,
                    "catalog backend unavailable during model selection"
                );
                Ok(FlowOutcome::BackendUnavailable { model, year })
            }
            Err(CatalogError::UnsupportedModel { known_models, .. }) => {
                Ok(FlowOutcome::UnsupportedModel { known_models })
            }
            Err(source @ CatalogError::Protocol { .. }) => {
                Err(FlowError::Catalog { model_key: model.key, year, source })
            }
        }
    }
}

fn select_type(state: &mut ConversationState, utterance: &Utterance) -> FlowOutcome {
    let Some((model, year)) = loaded_selection(state) else {
        state.reset();
        return FlowOutcome::NoAccessoriesLoaded;
    };

    let Some(facet) = utterance.first_match(&state.available_types, |facet| facet.name.as_str())
    else {
        return FlowOutcome::InvalidType { types: state.available_types.clone() };
    };
    let type_name = facet.name.clone();

    let subset = filter_records(&state.all_accessories, &type_name, None);
    let sub_types = state.labels.subtypes(&subset);
    state.choose_type(type_name.clone(), sub_types.clone());

    if state.step == FlowStep::ShowProducts {
        return FlowOutcome::ProductsShown {
            model,
            year,
            type_name,
            sub_type: None,
            products: subset,
            repeated: false,
        };
    }

    FlowOutcome::TypeSelected {
        model,
        year,
        type_name,
        item_count: subset.len(),
        price_range: price_range(&subset),
        sub_types,
    }
}

fn select_sub_type(state: &mut ConversationState, utterance: &Utterance) -> FlowOutcome {
    let (Some((model, year)), Some(type_name)) = (loaded_selection(state), state.selected_type.clone())
    else {
        state.reset();
        return FlowOutcome::NoAccessoriesLoaded;
    };

    let Some(facet) =
        utterance.first_match(&state.available_sub_types, |facet| facet.name.as_str())
    else {
        return FlowOutcome::InvalidSubType { sub_types: state.available_sub_types.clone() };
    };
    let sub_type = facet.name.clone();

    state.choose_sub_type(sub_type.clone());
    FlowOutcome::ProductsShown {
        model,
        year,
        type_name,
        sub_type: Some(sub_type),
        products: state.selected_accessories(),
        repeated: false,
    }
}

fn show_products(state: &mut ConversationState) -> FlowOutcome {
    let (Some((model, year)), Some(type_name)) = (loaded_selection(state), state.selected_type.clone())
    else {
        state.reset();
        return FlowOutcome::NoAccessoriesLoaded;
    };

    FlowOutcome::ProductsShown {
        model,
        year,
        type_name,
        sub_type: state.selected_sub_type.clone(),
        products: state.selected_accessories(),
        repeated: true,
    }
}

fn loaded_selection(state: &ConversationState) -> Option<(ModelSpec, u16)> {
    if state.all_accessories.is_empty() {
        return None;
    }
    Some((state.selected_model.clone()?, state.selected_year?))
}
