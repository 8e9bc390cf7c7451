//! Deterministic demo catalog used by tests and the offline CLI mode.

use rust_decimal::Decimal;

use crate::catalog::facets::FacetDescriptor;
use crate::catalog::memory::InMemoryCatalogSource;
use crate::domain::accessory::AccessoryRecord;

// (type, type id, subtype, subtype id, name, price)
type Line = (&'static str, i64, &'static str, i64, &'static str, i64);

const CRETA_2024: &[Line] = &[
    ("Interiors", 1, "Mats", 11, "3D Floor Mats Black", 3450),
    ("Interiors", 1, "Mats", 11, "Premium Carpet Mats", 2890),
    ("Interiors", 1, "Mats", 11, "Tray Type Mats", 2450),
    ("Interiors", 1, "Mats", 11, "Boot Mat", 1650),
    ("Interiors", 1, "Mats", 11, "Luxury Mat Set", 5200),
    ("Interiors", 1, "Seat Covers", 12, "Leatherette Seat Cover Beige", 14500),
    ("Interiors", 1, "Seat Covers", 12, "Leatherette Seat Cover Black", 14500),
    ("Interiors", 1, "Seat Covers", 12, "Fabric Seat Cover", 8900),
    ("Interiors", 1, "Seat Covers", 12, "Neck Rest Pair", 0),
    ("Interiors", 1, "Ambient Lighting", 13, "Footwell Lamp Kit", 3200),
    ("Interiors", 1, "Ambient Lighting", 13, "Door Ambient Strip", 4100),
    ("Interiors", 1, "Ambient Lighting", 13, "Scuff Plate Illuminated", 6400),
    ("Exteriors", 2, "Mouldings", 22, "Body Side Moulding", 3850),
    ("Exteriors", 2, "Mouldings", 22, "Chrome Window Garnish", 4250),
    ("Exteriors", 2, "Mouldings", 22, "Tail Lamp Garnish", 2150),
    ("Exteriors", 2, "Mud Flaps", 23, "Mud Flap Set", 990),
    ("Exteriors", 2, "Mud Flaps", 23, "Designer Mud Flap Set", 1450),
];

const I20_2018: &[Line] = &[
    ("Exteriors", 2, "Body Kits", 21, "Front Skid Plate", 5600),
    ("Exteriors", 2, "Body Kits", 21, "Rear Spoiler", 7800),
    ("Exteriors", 2, "Mouldings", 22, "Door Visor", 2400),
    ("Exteriors", 2, "Mouldings", 22, "Bonnet Scoop Garnish", 1800),
    ("Electronics", 3, "Infotainment", 31, "Touchscreen Head Unit", 21500),
    ("Electronics", 3, "Infotainment", 31, "Rear Speaker Pair", 4300),
    ("Electronics", 3, "Dash Cameras", 32, "Front Dash Camera", 6900),
    ("Common", 4, "Car Care", 41, "Car Care Kit", 0),
];

const VENUE_2023: &[Line] = &[
    ("Electronics", 3, "Dash Cameras", 32, "Dual Channel Dash Camera", 11900),
    ("Electronics", 3, "Infotainment", 31, "Wireless Charger", 3900),
    ("Interiors", 1, "Mats", 11, "Tray Type Mats", 2550),
    ("Interiors", 1, "Seat Covers", 12, "Leatherette Seat Cover", 13900),
];

/// Creta 2024, i20 2018 and Venue 2023 carry data; every other pair is empty.
pub fn demo_source() -> InMemoryCatalogSource {
    InMemoryCatalogSource::new()
        .with_accessories(36, 2024, records(3_600, CRETA_2024))
        .with_accessories(35, 2018, records(3_500, I20_2018))
        .with_accessories(37, 2023, records(3_700, VENUE_2023))
        .with_descriptors(type_descriptors(), subtype_descriptors())
}

pub fn records(first_id: i64, lines: &[Line]) -> Vec<AccessoryRecord> {
    lines
        .iter()
        .zip(first_id..)
        .map(|(&(type_name, type_id, sub_type, sub_type_id, name, price), id)| AccessoryRecord {
            id,
            accessory_name: name.to_string(),
            accessory_code: Some(format!("ACC-{id}")),
            type_name: Some(type_name.to_string()),
            type_id: Some(type_id),
            sub_type: Some(sub_type.to_string()),
            sub_type_id: Some(sub_type_id),
            mrp: Some(Decimal::new(price, 0)),
            body: Some(format!(
                "<p><strong>{name}</strong></p><ul><li>Genuine accessory</li><li>Category: {sub_type}</li></ul>"
            )),
            image: (price > 0).then(|| format!("{id}.png")),
        })
        .collect()
}

pub fn type_descriptors() -> Vec<FacetDescriptor> {
    descriptors(&[(1, "Interiors"), (2, "Exteriors"), (3, "Electronics"), (4, "Common")])
}

pub fn subtype_descriptors() -> Vec<FacetDescriptor> {
    descriptors(&[
        (11, "Mats"),
        (12, "Seat Covers"),
        (13, "Ambient Lighting"),
        (21, "Body Kits"),
        (22, "Mouldings"),
        (23, "Mud Flaps"),
        (31, "Infotainment"),
        (32, "Dash Cameras"),
        (41, "Car Care"),
    ])
}

fn descriptors(entries: &[(i64, &str)]) -> Vec<FacetDescriptor> {
    entries
        .iter()
        .zip(1..)
        .map(|(&(id, description), display_seq)| FacetDescriptor {
            id,
            description: description.to_string(),
            display_seq,
        })
        .collect()
}
