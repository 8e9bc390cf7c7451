use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Facet, PriceRange};
use crate::config::CatalogConfig;
use crate::domain::accessory::AccessoryRecord;
use crate::domain::model::ModelSpec;
use crate::flows::engine::{FlowOutcome, TurnOutcome};
use crate::flows::states::FlowStep;

const DEFAULT_DESCRIPTION_LIMIT: usize = 150;
const MISSING_DESCRIPTION: &str = "No description available";
const ELLIPSIS: &str = "...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowErrorKind {
    UnsupportedModel,
    YearUnavailable,
    EmptyResult,
    BackendUnavailable,
    InvalidSelection,
    NoAccessoriesLoaded,
}

/// Uniform payload returned for every turn; consumed by HTTP callers and by
/// the language-model prompt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResult {
    pub success: bool,
    pub step: FlowStep,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_accessories: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_years: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_types: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_sub_types: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<ProductView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FlowErrorKind>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_offline: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_empty: bool,
}

/// Display shape of one accessory in the final list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub description: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub sub_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResponseBuilder {
    image_base_url: String,
    description_limit: usize,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new("http://localhost:8080/images", DEFAULT_DESCRIPTION_LIMIT)
    }
}

impl ResponseBuilder {
    pub fn new(image_base_url: impl Into<String>, description_limit: usize) -> Self {
        Self { image_base_url: image_base_url.into(), description_limit }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.image_base_url.clone(), config.description_limit)
    }

    pub fn build(&self, turn: &TurnOutcome) -> FlowResult {
        let step = turn.to;
        match &turn.outcome {
            FlowOutcome::ModelSelected { model, year, total, types, price_range } => FlowResult {
                success: true,
                step,
                message: format!(
                    "Perfect! You selected {} ({year}). I found {total} accessories. Please choose an accessory type:",
                    model.display_name()
                ),
                selected_model: Some(model.key.clone()),
                selected_year: Some(*year),
                total_accessories: Some(*total),
                available_types: types.clone(),
                price_range: Some(*price_range),
                next_action: Some(format!("Please select a type: {}", facet_names(types))),
                ..FlowResult::default()
            },
            FlowOutcome::UnsupportedModel { known_models } => FlowResult {
                step,
                message: "Please specify a valid model. Available models are:".to_string(),
                available_models: known_models.clone(),
                next_action: Some(
                    "Please say the car model name and year (e.g., 'i20 2018', 'Creta 2023')"
                        .to_string(),
                ),
                error: Some(FlowErrorKind::UnsupportedModel),
                ..FlowResult::default()
            },
            FlowOutcome::YearUnavailable { model, year } => FlowResult {
                message: format!("{} {year} is not available in our database.", model.display_name()),
                suggestion: Some(format!(
                    "Try {} with years: {}",
                    model.display_name(),
                    suggested_years(model)
                )),
                error: Some(FlowErrorKind::YearUnavailable),
                ..empty_outcome(step, model, *year)
            },
            FlowOutcome::EmptyResult { model, year } => FlowResult {
                message: format!(
                    "No accessories found for {} {year}. This model/year combination exists but has no accessories listed.",
                    model.display_name()
                ),
                suggestion: Some(format!(
                    "Try different years for {}: {}",
                    model.display_name(),
                    suggested_years(model)
                )),
                error: Some(FlowErrorKind::EmptyResult),
                ..empty_outcome(step, model, *year)
            },
            FlowOutcome::BackendUnavailable { model, year } => FlowResult {
                step,
                message: "The accessory catalog service is currently unavailable. Please try again later."
                    .to_string(),
                selected_model: Some(model.key.clone()),
                selected_year: Some(*year),
                suggestion: Some(
                    "Check your internet connection or try again in a few minutes.".to_string(),
                ),
                error: Some(FlowErrorKind::BackendUnavailable),
                is_offline: true,
                ..FlowResult::default()
            },
            FlowOutcome::NoAccessoriesLoaded => FlowResult {
                step,
                message: "No accessories data available. Please start over with a new model selection."
                    .to_string(),
                suggestion: Some("Try a different model or year combination.".to_string()),
                next_action: Some("Please say the car model name and year".to_string()),
                error: Some(FlowErrorKind::NoAccessoriesLoaded),
                ..FlowResult::default()
            },
            FlowOutcome::TypeSelected {
                model,
                year,
                type_name,
                item_count,
                sub_types,
                price_range,
            } => FlowResult {
                success: true,
                step,
                message: format!(
                    "Great! You selected {type_name} for {}. Found {item_count} items. Now choose a subcategory:",
                    model.display_name()
                ),
                selected_model: Some(model.key.clone()),
                selected_year: Some(*year),
                selected_type: Some(type_name.clone()),
                total_accessories: Some(*item_count),
                available_sub_types: sub_types.clone(),
                price_range: Some(*price_range),
                next_action: Some("Please select a subcategory from the list above".to_string()),
                ..FlowResult::default()
            },
            FlowOutcome::InvalidType { types } => FlowResult {
                step,
                message: "Please select a valid accessory type:".to_string(),
                available_types: types.clone(),
                next_action: Some(format!("Please say one of: {}", facet_names(types))),
                error: Some(FlowErrorKind::InvalidSelection),
                ..FlowResult::default()
            },
            FlowOutcome::InvalidSubType { sub_types } => FlowResult {
                step,
                message: "Please select a valid subcategory:".to_string(),
                available_sub_types: sub_types.clone(),
                next_action: Some(
                    "Please say one of the subcategory names listed above".to_string(),
                ),
                error: Some(FlowErrorKind::InvalidSelection),
                ..FlowResult::default()
            },
            FlowOutcome::ProductsShown { model, year, type_name, sub_type, products, repeated } => {
                let heading = match sub_type {
                    Some(sub_type) => format!(
                        "Here are the {sub_type} accessories in {type_name} category for {}",
                        model.display_name()
                    ),
                    None => {
                        format!("Here are the {type_name} accessories for {}", model.display_name())
                    }
                };
                let message = if *repeated {
                    format!("{heading}. Ask about any of them, or reset to start a new search.")
                } else {
                    format!("Perfect! {heading}:")
                };

                FlowResult {
                    success: true,
                    step,
                    message,
                    selected_model: Some(model.key.clone()),
                    selected_year: Some(*year),
                    selected_type: Some(type_name.clone()),
                    selected_sub_type: sub_type.clone(),
                    total_accessories: Some(products.len()),
                    accessories: products.iter().map(|record| self.product_view(record)).collect(),
                    price_range: Some(crate::catalog::price_range(products)),
                    next_action: Some(
                        "You can ask for details about any accessory or start a new search"
                            .to_string(),
                    ),
                    ..FlowResult::default()
                }
            }
        }
    }

    pub fn product_view(&self, record: &AccessoryRecord) -> ProductView {
        let image = record.image.as_deref().map(str::trim).filter(|image| !image.is_empty());
        ProductView {
            id: record.id,
            name: record.accessory_name.clone(),
            code: record.accessory_code.clone(),
            price: record.mrp,
            description: self.describe(record),
            image: image.map(str::to_owned),
            image_url: image.map(|image| self.image_url(image)),
            type_name: record.type_name.clone(),
            sub_type: record.sub_type.clone(),
        }
    }

    fn describe(&self, record: &AccessoryRecord) -> String {
        let Some(text) = record.plain_body().filter(|text| !text.is_empty()) else {
            return MISSING_DESCRIPTION.to_string();
        };

        if text.chars().count() <= self.description_limit {
            return text;
        }

        let truncated = text.chars().take(self.description_limit).collect::<String>();
        format!("{}{ELLIPSIS}", truncated.trim_end())
    }

    fn image_url(&self, image: &str) -> String {
        if image.starts_with("http://") || image.starts_with("https://") {
            return image.to_string();
        }
        format!("{}/{}", self.image_base_url.trim_end_matches('/'), image.trim_start_matches('/'))
    }
}

fn empty_outcome(step: FlowStep, model: &ModelSpec, year: u16) -> FlowResult {
    FlowResult {
        step,
        selected_model: Some(model.key.clone()),
        selected_year: Some(year),
        available_years: model.years.clone(),
        next_action: Some("Please try a different year or model".to_string()),
        is_empty: true,
        ..FlowResult::default()
    }
}

fn suggested_years(model: &ModelSpec) -> String {
    model.suggested_years().iter().map(u16::to_string).collect::<Vec<_>>().join(", ")
}

fn facet_names(facets: &[Facet]) -> String {
    facets.iter().map(|facet| facet.name.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::catalog::{Facet, PriceRange};
    use crate::domain::accessory::AccessoryRecord;
    use crate::domain::model::ModelSpec;
    use crate::flows::engine::{FlowOutcome, TurnOutcome};
    use crate::flows::response::{FlowErrorKind, ResponseBuilder};
    use crate::flows::states::FlowStep;

    fn turn(to: FlowStep, outcome: FlowOutcome) -> TurnOutcome {
        TurnOutcome { from: FlowStep::ModelSelection, to, outcome }
    }

    fn record(body: Option<&str>, image: Option<&str>) -> AccessoryRecord {
        AccessoryRecord {
            id: 7,
            accessory_name: "Boot Mat".to_string(),
            accessory_code: Some("ACC-7".to_string()),
            type_name: Some("Interiors".to_string()),
            type_id: Some(1),
            sub_type: Some("Mats".to_string()),
            sub_type_id: Some(11),
            mrp: Some(Decimal::new(1650, 0)),
            body: body.map(str::to_owned),
            image: image.map(str::to_owned),
        }
    }

    #[test]
    fn model_selected_payload_carries_types_and_hint() {
        let builder = ResponseBuilder::default();
        let result = builder.build(&turn(
            FlowStep::TypeSelection,
            FlowOutcome::ModelSelected {
                model: ModelSpec::new("i20", 35, 2018..=2024),
                year: 2018,
                total: 8,
                types: vec![
                    Facet { id: Some(2), name: "Exteriors".to_string(), count: 4 },
                    Facet { id: Some(3), name: "Electronics".to_string(), count: 3 },
                ],
                price_range: PriceRange::default(),
            },
        ));

        assert!(result.success);
        assert_eq!(
            result.message,
            "Perfect! You selected I20 (2018). I found 8 accessories. Please choose an accessory type:"
        );
        assert_eq!(result.next_action.as_deref(), Some("Please select a type: Exteriors, Electronics"));

        let json = serde_json::to_value(&result).expect("serialize result");
        assert_eq!(json["step"], "type_selection");
        assert_eq!(json["selectedModel"], "i20");
        assert_eq!(json["availableTypes"][0]["name"], "Exteriors");
        assert!(json.get("error").is_none());
        assert!(json.get("isOffline").is_none());
    }

    #[test]
    fn year_unavailable_suggests_last_three_years() {
        let result = ResponseBuilder::default().build(&turn(
            FlowStep::ModelSelection,
            FlowOutcome::YearUnavailable { model: ModelSpec::new("alcazar", 34, 2021..=2024), year: 2019 },
        ));

        assert!(!result.success);
        assert!(result.is_empty);
        assert_eq!(result.error, Some(FlowErrorKind::YearUnavailable));
        assert_eq!(result.message, "ALCAZAR 2019 is not available in our database.");
        assert_eq!(result.suggestion.as_deref(), Some("Try ALCAZAR with years: 2022, 2023, 2024"));
        assert_eq!(result.available_years, vec![2021, 2022, 2023, 2024]);
    }

    #[test]
    fn offline_payload_sets_offline_flag() {
        let result = ResponseBuilder::default().build(&turn(
            FlowStep::ModelSelection,
            FlowOutcome::BackendUnavailable { model: ModelSpec::new("venue", 37, 2019..=2024), year: 2023 },
        ));

        let json = serde_json::to_value(&result).expect("serialize result");
        assert_eq!(json["isOffline"], true);
        assert_eq!(json["error"], "backend_unavailable");
        assert!(json.get("isEmpty").is_none());
    }

    #[test]
    fn product_view_strips_html_and_truncates() {
        let builder = ResponseBuilder::new("https://img.example.test/accessories/", 20);
        let long = "<p>Premium <b>tray</b> type mat with raised edges and anti-skid backing</p>";

        let view = builder.product_view(&record(Some(long), Some("/7.png")));

        assert_eq!(view.description, "Premium tray type ma...");
        assert_eq!(view.image_url.as_deref(), Some("https://img.example.test/accessories/7.png"));
        assert_eq!(view.type_name.as_deref(), Some("Interiors"));
    }

    #[test]
    fn short_and_missing_descriptions() {
        let builder = ResponseBuilder::default();

        let short = builder.product_view(&record(Some("<p>Fits  all\ntrims</p>"), None));
        assert_eq!(short.description, "Fits all trims");
        assert_eq!(short.image_url, None);

        let missing = builder.product_view(&record(Some("<br/>  "), None));
        assert_eq!(missing.description, "No description available");
    }

    #[test]
    fn product_view_serializes_price_as_number() {
        let view = ResponseBuilder::default().product_view(&record(None, Some("7.png")));
        let json = serde_json::to_value(&view).expect("serialize view");

        assert_eq!(json["price"], 1650.0);
        assert_eq!(json["type"], "Interiors");
        assert_eq!(json["imageUrl"], "http://localhost:8080/images/7.png");
    }
}
