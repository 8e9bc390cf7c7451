use std::fmt::Write as _;

use kitfinder_core::catalog::Facet;
use kitfinder_core::flows::{FlowResult, ProductView};

const FALLBACK_REPLY: &str = "I can help you find genuine accessories. Tell me your car model and year, for example \"Creta 2024\".";

/// Deterministic replies built straight from the flow result. Used when no
/// language model is configured or the model call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn render(&self, flow: Option<&FlowResult>) -> String {
        let Some(flow) = flow else {
            return FALLBACK_REPLY.to_string();
        };

        let mut reply = flow.message.clone();
        if !flow.available_models.is_empty() {
            let models =
                flow.available_models.iter().map(|model| model.to_uppercase()).collect::<Vec<_>>();
            let _ = write!(reply, "\nAvailable models: {}", models.join(", "));
        }
        if !flow.available_years.is_empty() {
            let years =
                flow.available_years.iter().map(|year| year.to_string()).collect::<Vec<_>>();
            let _ = write!(reply, "\nAvailable years: {}", years.join(", "));
        }
        push_facets(&mut reply, &flow.available_types);
        push_facets(&mut reply, &flow.available_sub_types);
        for product in &flow.accessories {
            push_product(&mut reply, product);
        }
        if let Some(suggestion) = &flow.suggestion {
            let _ = write!(reply, "\n{suggestion}");
        }
        if let Some(next_action) = &flow.next_action {
            let _ = write!(reply, "\n{next_action}");
        }
        reply
    }
}

fn push_facets(reply: &mut String, facets: &[Facet]) {
    for facet in facets {
        let _ = write!(reply, "\n- {} ({} items)", facet.name, facet.count);
    }
}

fn push_product(reply: &mut String, product: &ProductView) {
    match product.price {
        Some(price) => {
            let _ = write!(reply, "\n- {} (Rs. {})", product.name, price.normalize());
        }
        None => {
            let _ = write!(reply, "\n- {} (price on request)", product.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use kitfinder_core::catalog::Facet;
    use kitfinder_core::flows::{FlowResult, FlowStep, ProductView};
    use rust_decimal::Decimal;

    use crate::template::TemplateResponder;

    fn product(name: &str, price: Option<Decimal>) -> ProductView {
        ProductView {
            id: 1,
            name: name.to_string(),
            code: None,
            price,
            description: "No description available".to_string(),
            image: None,
            image_url: None,
            type_name: Some("Interiors".to_string()),
            sub_type: Some("Mats".to_string()),
        }
    }

    #[test]
    fn type_selection_lists_types_with_counts() {
        let flow = FlowResult {
            success: true,
            step: FlowStep::TypeSelection,
            message: "Perfect! You selected I20 (2018).".to_string(),
            available_types: vec![
                Facet { id: None, name: "Exteriors".to_string(), count: 4 },
                Facet { id: None, name: "Electronics".to_string(), count: 3 },
            ],
            next_action: Some("Please select a type: Exteriors, Electronics".to_string()),
            ..FlowResult::default()
        };

        let reply = TemplateResponder.render(Some(&flow));

        assert_eq!(
            reply,
            "Perfect! You selected I20 (2018).\n- Exteriors (4 items)\n- Electronics (3 items)\nPlease select a type: Exteriors, Electronics"
        );
    }

    #[test]
    fn products_show_prices_or_on_request() {
        let flow = FlowResult {
            success: true,
            step: FlowStep::ShowProducts,
            message: "Here you go:".to_string(),
            accessories: vec![
                product("Boot Mat", Some(Decimal::new(165000, 2))),
                product("Neck Rest Pair", None),
            ],
            ..FlowResult::default()
        };

        let reply = TemplateResponder.render(Some(&flow));

        assert!(reply.contains("- Boot Mat (Rs. 1650)"));
        assert!(reply.contains("- Neck Rest Pair (price on request)"));
    }

    #[test]
    fn unsupported_model_lists_models_uppercased() {
        let flow = FlowResult {
            step: FlowStep::ModelSelection,
            message: "Sorry, I didn't recognize that model.".to_string(),
            available_models: vec!["creta".to_string(), "venue".to_string()],
            ..FlowResult::default()
        };

        assert!(TemplateResponder.render(Some(&flow)).contains("Available models: CRETA, VENUE"));
    }

    #[test]
    fn missing_flow_gets_the_greeting() {
        assert!(TemplateResponder.render(None).contains("car model and year"));
    }
}
