pub mod accessory;
pub mod model;
