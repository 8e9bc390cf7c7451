//! Facet extraction over a fetched record set.
//!
//! Everything here is pure: same input order in, same output out. Facets are
//! ordered by descending count and ties keep first-seen order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::accessory::AccessoryRecord;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub count: usize,
}

/// Entry of the backend's type/subtype reference lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetDescriptor {
    pub id: i64,
    pub description: String,
    #[serde(default)]
    pub display_seq: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(with = "rust_decimal::serde::float")]
    pub min: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub average: Decimal,
}

impl PriceRange {
    pub fn is_empty(&self) -> bool {
        self.max == Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryItem {
    pub id: i64,
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub count: usize,
    pub subtype_counts: BTreeMap<String, usize>,
    pub items: Vec<CategoryItem>,
    pub price_range: PriceRange,
}

/// How facet names are produced for a conversation: derived from the record
/// text, or taken from the backend's reference lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FacetLabels {
    #[default]
    Derived,
    Backend { types: Arc<[FacetDescriptor]>, subtypes: Arc<[FacetDescriptor]> },
}

impl FacetLabels {
    pub fn types(&self, records: &[AccessoryRecord]) -> Vec<Facet> {
        match self {
            Self::Derived => extract_types(records),
            Self::Backend { types, .. } => label_types(records, types),
        }
    }

    pub fn subtypes(&self, records: &[AccessoryRecord]) -> Vec<Facet> {
        match self {
            Self::Derived => extract_subtypes(records),
            Self::Backend { subtypes, .. } => label_subtypes(records, subtypes),
        }
    }
}

pub fn extract_types(records: &[AccessoryRecord]) -> Vec<Facet> {
    group_facets(records, |record| record.type_label().map(|name| (name, record.type_id)))
}

pub fn extract_subtypes(records: &[AccessoryRecord]) -> Vec<Facet> {
    group_facets(records, |record| record.sub_type_label().map(|name| (name, record.sub_type_id)))
}

/// Type facets named and identified by the backend reference list, ordered by
/// its display sequence before the count sort. Counts come from the records
/// (case-insensitive name match); unused descriptors are dropped.
pub fn label_types(records: &[AccessoryRecord], descriptors: &[FacetDescriptor]) -> Vec<Facet> {
    label_facets(records, descriptors, AccessoryRecord::type_label)
}

pub fn label_subtypes(records: &[AccessoryRecord], descriptors: &[FacetDescriptor]) -> Vec<Facet> {
    label_facets(records, descriptors, AccessoryRecord::sub_type_label)
}

pub fn price_range(records: &[AccessoryRecord]) -> PriceRange {
    let prices = records.iter().filter_map(AccessoryRecord::positive_price).collect::<Vec<_>>();
    let (Some(min), Some(max)) = (prices.iter().min().copied(), prices.iter().max().copied())
    else {
        return PriceRange::default();
    };

    let total = prices.iter().copied().sum::<Decimal>();
    let average = (total / Decimal::from(prices.len()))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    PriceRange { min, max, average }
}

pub fn categorize(records: &[AccessoryRecord]) -> BTreeMap<String, CategorySummary> {
    let mut grouped: BTreeMap<String, Vec<&AccessoryRecord>> = BTreeMap::new();
    for record in records {
        if let Some(type_name) = record.type_label() {
            grouped.entry(type_name.to_string()).or_default().push(record);
        }
    }

    grouped
        .into_iter()
        .map(|(type_name, members)| {
            let mut subtype_counts = BTreeMap::new();
            for record in &members {
                if let Some(sub_type) = record.sub_type_label() {
                    *subtype_counts.entry(sub_type.to_string()).or_insert(0) += 1;
                }
            }
            let items = members
                .iter()
                .map(|record| CategoryItem {
                    id: record.id,
                    name: record.accessory_name.clone(),
                    price: record.mrp,
                    code: record.accessory_code.clone(),
                })
                .collect();
            let owned = members.iter().map(|record| (*record).clone()).collect::<Vec<_>>();

            let summary = CategorySummary {
                count: members.len(),
                subtype_counts,
                items,
                price_range: price_range(&owned),
            };
            (type_name, summary)
        })
        .collect()
}

fn group_facets<'a, F>(records: &'a [AccessoryRecord], key: F) -> Vec<Facet>
where
    F: Fn(&'a AccessoryRecord) -> Option<(&'a str, Option<i64>)>,
{
    let mut facets: Vec<Facet> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (name, id) in records.iter().filter_map(key) {
        match positions.get(name) {
            Some(&position) => facets[position].count += 1,
            None => {
                positions.insert(name, facets.len());
                facets.push(Facet { id, name: name.to_string(), count: 1 });
            }
        }
    }

    sort_by_count(&mut facets);
    facets
}

fn label_facets<F>(records: &[AccessoryRecord], descriptors: &[FacetDescriptor], key: F) -> Vec<Facet>
where
    F: Fn(&AccessoryRecord) -> Option<&str>,
{
    let mut ordered = descriptors.to_vec();
    ordered.sort_by_key(|descriptor| descriptor.display_seq);

    let mut facets = ordered
        .into_iter()
        .filter_map(|descriptor| {
            let name = descriptor.description.trim();
            let count = records
                .iter()
                .filter_map(&key)
                .filter(|label| label.eq_ignore_ascii_case(name))
                .count();
            (count > 0).then(|| Facet { id: Some(descriptor.id), name: name.to_string(), count })
        })
        .collect::<Vec<_>>();

    sort_by_count(&mut facets);
    facets
}

fn sort_by_count(facets: &mut [Facet]) {
    // sort_by is stable, which keeps first-seen order between equal counts
    facets.sort_by(|left, right| right.count.cmp(&left.count));
}
