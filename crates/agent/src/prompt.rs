use kitfinder_core::domain::model::ModelRegistry;
use kitfinder_core::flows::FlowResult;

/// Frames a user utterance and the flow result for the language model.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    preamble: String,
}

impl PromptBuilder {
    pub fn new(registry: &ModelRegistry) -> Self {
        let models = registry
            .models()
            .iter()
            .map(|model| model.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        let preamble = format!(
            "You are a helpful assistant for genuine vehicle accessories.\n\
             You help users navigate through:\n\
             - Models: {models}\n\
             - Accessory types and subcategories taken from the live catalog\n\
             - Product details with pricing and descriptions\n\n\
             Guide users step by step: model selection, type selection, subtype selection, products.\n\
             Only mention models, years, categories and products that appear in the data you are given.\n\
             When nothing is found for a model and year, suggest the alternatives listed in the data.\n\
             Always end with a clear next step for the user."
        );
        Self { preamble }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn build(&self, utterance: &str, flow: Option<&FlowResult>) -> String {
        let Some(flow) = flow else {
            return format!(
                "{}\n\nUser query: \"{utterance}\"\n\n\
                 Live catalog data is not available for this message. \
                 Answer helpfully without inventing products or prices.",
                self.preamble
            );
        };

        let data = serde_json::to_string_pretty(flow).unwrap_or_else(|_| flow.message.clone());
        let framing = if flow.is_offline {
            "The accessory catalog service is currently unavailable:"
        } else if flow.is_empty {
            "No accessories found for the requested model/year combination:"
        } else {
            "Real-time data from the accessory catalog:"
        };
        let instruction = if flow.is_offline {
            "Please provide a helpful response acknowledging the service is temporarily unavailable."
        } else if flow.is_empty {
            "Please explain why no accessories were found and suggest alternatives from the available years."
        } else {
            "Please provide a helpful response based on this live data and guide the user to the next step."
        };

        format!(
            "{}\n\nUser query: \"{utterance}\"\n\n{framing}\n{data}\n\n{instruction}",
            self.preamble
        )
    }
}

#[cfg(test)]
mod tests {
    use kitfinder_core::domain::model::ModelRegistry;
    use kitfinder_core::flows::{FlowResult, FlowStep};

    use crate::prompt::PromptBuilder;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&ModelRegistry::default())
    }

    #[test]
    fn preamble_lists_configured_models() {
        assert!(builder().preamble().contains("ALCAZAR, I20, CRETA, VENUE, AURA, NIOS"));
    }

    #[test]
    fn offline_empty_and_live_framings_differ() {
        let offline = FlowResult { is_offline: true, ..FlowResult::default() };
        let empty = FlowResult { is_empty: true, ..FlowResult::default() };
        let live = FlowResult {
            success: true,
            step: FlowStep::TypeSelection,
            message: "Perfect!".to_string(),
            ..FlowResult::default()
        };

        let builder = builder();
        assert!(builder.build("hi", Some(&offline)).contains("temporarily unavailable"));
        assert!(builder.build("hi", Some(&empty)).contains("No accessories found"));

        let prompt = builder.build("creta 2024", Some(&live));
        assert!(prompt.contains("User query: \"creta 2024\""));
        assert!(prompt.contains("Real-time data"));
        assert!(prompt.contains("\"step\": \"type_selection\""));
    }

    #[test]
    fn missing_flow_data_is_stated() {
        let prompt = builder().build("hello", None);

        assert!(prompt.contains("not available"));
        assert!(!prompt.contains("Real-time data"));
    }
}
