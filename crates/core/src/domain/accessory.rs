use std::sync::{Arc, LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern is valid"));

/// Shared, immutable result of one catalog fetch. Conversation state holds a
/// clone of the `Arc`, never a copy of the records.
pub type AccessoryList = Arc<[AccessoryRecord]>;

/// One catalog item exactly as the product service returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryRecord {
    pub id: i64,
    #[serde(default)]
    pub accessory_name: String,
    #[serde(default)]
    pub accessory_code: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub sub_type_id: Option<i64>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl AccessoryRecord {
    /// Price when it is set; zero and negative prices count as unset.
    pub fn positive_price(&self) -> Option<Decimal> {
        self.mrp.filter(|price| *price > Decimal::ZERO)
    }

    pub fn type_label(&self) -> Option<&str> {
        self.type_name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    pub fn sub_type_label(&self) -> Option<&str> {
        self.sub_type.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    pub fn is_type(&self, type_name: &str) -> bool {
        self.type_label().is_some_and(|name| name.eq_ignore_ascii_case(type_name.trim()))
    }

    pub fn is_sub_type(&self, sub_type: &str) -> bool {
        self.sub_type_label().is_some_and(|name| name.eq_ignore_ascii_case(sub_type.trim()))
    }

    /// Description text with markup removed and whitespace collapsed.
    pub fn plain_body(&self) -> Option<String> {
        let body = self.body.as_deref()?;
        let text = strip_html(body);
        (!text.is_empty()).then_some(text)
    }

    /// Lower-cased text used by free-text search.
    pub fn search_text(&self) -> String {
        [
            Some(self.accessory_name.clone()),
            self.type_label().map(str::to_owned),
            self.sub_type_label().map(str::to_owned),
            self.plain_body(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

pub fn strip_html(raw: &str) -> String {
    HTML_TAG.replace_all(raw, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps records of the given type and, when present, subtype. Matching is
/// case-insensitive equality on the trimmed names.
pub fn filter_records(
    records: &[AccessoryRecord],
    type_name: &str,
    sub_type: Option<&str>,
) -> Vec<AccessoryRecord> {
    records
        .iter()
        .filter(|record| record.is_type(type_name))
        .filter(|record| sub_type.map_or(true, |sub_type| record.is_sub_type(sub_type)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::accessory::{filter_records, strip_html, AccessoryRecord};

    fn record(id: i64, type_name: &str, sub_type: &str) -> AccessoryRecord {
        AccessoryRecord {
            id,
            accessory_name: format!("Item {id}"),
            accessory_code: None,
            type_name: Some(type_name.to_string()),
            type_id: None,
            sub_type: Some(sub_type.to_string()),
            sub_type_id: None,
            mrp: None,
            body: None,
            image: None,
        }
    }

    #[test]
    fn deserializes_backend_field_names() {
        let raw = r#"{
            "id": 901,
            "accessoryName": "Body Side Moulding",
            "accessoryCode": "BSM-01",
            "type": "Exteriors",
            "typeId": 2,
            "subType": "Mouldings",
            "subTypeId": 14,
            "mrp": 1850.5,
            "body": "<p>Chrome <b>finish</b></p>",
            "image": "bsm.png"
        }"#;

        let parsed: AccessoryRecord = serde_json::from_str(raw).expect("record should parse");

        assert_eq!(parsed.type_name.as_deref(), Some("Exteriors"));
        assert_eq!(parsed.sub_type_id, Some(14));
        assert_eq!(parsed.mrp, Some(Decimal::new(18505, 1)));
        assert_eq!(parsed.plain_body().as_deref(), Some("Chrome finish"));
    }

    #[test]
    fn prices_serialize_back_as_json_numbers() {
        let mut item = record(7, "Interiors", "Mats");
        item.mrp = Some(Decimal::new(3450, 0));

        let json = serde_json::to_value(&item).expect("record should serialize");

        assert!(json["mrp"].is_number(), "mrp was {}", json["mrp"]);
        assert_eq!(json["mrp"].as_f64(), Some(3450.0));
        assert_eq!(json["type"], "Interiors");

        let parsed: AccessoryRecord = serde_json::from_value(json).expect("record should parse");
        assert_eq!(parsed, item);

        item.mrp = None;
        let unpriced = serde_json::to_value(&item).expect("record should serialize");
        assert!(unpriced["mrp"].is_null());
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let parsed: AccessoryRecord =
            serde_json::from_str(r#"{"id": 1, "accessoryName": "Mat", "mrp": null}"#)
                .expect("sparse record should parse");

        assert!(parsed.type_label().is_none());
        assert!(parsed.positive_price().is_none());
        assert!(parsed.plain_body().is_none());
    }

    #[test]
    fn non_positive_prices_are_unset() {
        let mut item = record(1, "Interiors", "Mats");
        item.mrp = Some(Decimal::ZERO);
        assert!(item.positive_price().is_none());
        item.mrp = Some(Decimal::new(-5, 0));
        assert!(item.positive_price().is_none());
        item.mrp = Some(Decimal::new(499, 0));
        assert_eq!(item.positive_price(), Some(Decimal::new(499, 0)));
    }

    #[test]
    fn strip_html_removes_tags_and_collapses_whitespace() {
        assert_eq!(strip_html("<ul><li>Fits  front</li>\n<li>rear</li></ul>"), "Fits front rear");
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn filtering_twice_by_the_same_pair_is_idempotent() {
        let records = vec![
            record(1, "Interiors", "Mats"),
            record(2, "interiors", "mats"),
            record(3, "Interiors", "Covers"),
            record(4, "Exteriors", "Mats"),
        ];

        let once = filter_records(&records, "Interiors", Some("Mats"));
        let twice = filter_records(&once, "Interiors", Some("Mats"));

        assert_eq!(once.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(once, twice);
        assert_eq!(filter_records(&records, "INTERIORS", None).len(), 3);
    }
}
